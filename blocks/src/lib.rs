//! The reference block library: a line of text, a simple image, and a page
//! with a title, child blocks and comment threads.

pub mod fixture;
pub mod image;
pub mod line;
pub mod page;
pub mod pick;
pub mod relative_time;
pub mod threads;

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use mintty::editor::{ContentEditable, RichText};

pub use fixture::{FixtureError, demo_page, load_fixture, locate, parse_fixture};
pub use pick::standard_selector;

/// Current unix time in seconds.
pub type Clock = Rc<dyn Fn() -> u64>;

/// What the block implementations need from their host.
#[derive(Clone)]
pub struct Env {
    pub rich_text: Rc<dyn RichText>,
    pub clock: Clock,
}

impl Env {
    /// `contenteditable` surfaces and the system clock.
    pub fn system() -> Self {
        Env {
            rich_text: Rc::new(ContentEditable::new()),
            clock: Rc::new(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            }),
        }
    }

    /// Like [`Env::system`] with the clock frozen at `now` (unix seconds).
    pub fn at(now: u64) -> Self {
        Env {
            clock: Rc::new(move || now),
            ..Env::system()
        }
    }

    pub fn now(&self) -> u64 {
        (self.clock)()
    }
}
