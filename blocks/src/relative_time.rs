/// Human phrase for the distance between two unix times, e.g.
/// "5 minutes ago" or "in a day".
pub fn from_now(then_secs: u64, now_secs: u64) -> String {
    let (distance, future) = if then_secs > now_secs {
        (then_secs - now_secs, true)
    } else {
        (now_secs - then_secs, false)
    };
    let phrase = humanize(distance as f64);
    if future {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

fn humanize(secs: f64) -> String {
    let minutes = (secs / 60.0).round();
    let hours = (secs / 3600.0).round();
    let days = (secs / 86_400.0).round();
    let months = (secs / (86_400.0 * 30.4)).round();
    let years = (secs / (86_400.0 * 365.0)).round();

    if secs < 45.0 {
        "a few seconds".to_string()
    } else if secs < 90.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if minutes < 90.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if hours < 36.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days)
    } else if days < 45.0 || months <= 1.0 {
        "a month".to_string()
    } else if days < 320.0 {
        format!("{} months", months)
    } else if days < 548.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    }
}
