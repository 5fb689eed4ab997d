//! An image with an html caption.

use mintty::data::DataTree;
use mintty::dom::Element;
use mintty::format::{DATA_URI, TEXT_HTML};
use mintty::html::{escape_attr, sanitize};
use mintty::schema::{EditingUi, MarkupUi};
use mintty::{
    BlockSchema, BlockUi, Editor, Markup, MountError, MountedHandle, SlotsConfig, Values,
    ValuesConfig,
};

use crate::Env;

pub const NAME: &str = "image";

const CSS: &str = ".mintty-image {
  display: flex;
  flex-direction: column;
  justify-content: center;
  gap: 4px;
}
.mintty-image--image {
  background: whitesmoke;
  border-radius: 6px;
  max-height: 100px;
  max-width: 100px;
  object-fit: contain;
}
.mintty-image--caption {
  font-size: 0.85rem;
  color: #666;
  line-height: 1.4;
}";

pub fn schema() -> BlockSchema {
    BlockSchema::define(
        NAME,
        ValuesConfig::new()
            .field("imageSrc", DATA_URI)
            // caption
            .field("title", TEXT_HTML),
        SlotsConfig::new(),
    )
}

pub fn ui(_env: &Env) -> BlockUi {
    let schema = schema();
    BlockUi::new(markup(&schema), editing(&schema))
}

/// Legacy probe: carries `imageSrc` as a data uri.
pub fn is_image(data: &DataTree) -> bool {
    data.values.text("imageSrc", &DATA_URI).is_some()
}

pub fn markup(schema: &BlockSchema) -> MarkupUi {
    schema.for_markup(|input| {
        let src = input.values.text("imageSrc", &DATA_URI).unwrap_or("");
        let caption = input.values.text("title", &TEXT_HTML).unwrap_or("");
        Markup::new(format!(
            "<div class=\"mintty-image\">
  <img class=\"mintty-image--image\" src=\"{}\"/>
  <div class=\"mintty-image--caption\">
    {}
  </div>
</div>",
            escape_attr(src),
            sanitize(caption)
        ))
        .with_css(CSS)
    })
}

pub fn editing(schema: &BlockSchema) -> EditingUi {
    schema.for_editing(|input| {
        let img = Element::with_class("img", "mintty-image--image");
        img.set_attr("src", input.values.text("imageSrc", &DATA_URI).unwrap_or(""));
        let caption = Element::with_class("div", "mintty-image--caption");
        caption.set_inner_html(&sanitize(
            input.values.text("title", &TEXT_HTML).unwrap_or(""),
        ));

        let frame = Element::with_class("div", "mintty-image");
        // focusable
        frame.set_attr("tabindex", "1");
        frame.append(&img);
        frame.append(&caption);

        let apply = move |values: &Values| {
            if let Some(src) = values.text("imageSrc", &DATA_URI) {
                img.set_attr("src", src);
            }
            if let Some(title) = values.text("title", &TEXT_HTML) {
                caption.set_inner_html(&sanitize(title));
            }
        };

        let mount = move |container: &Element| -> Result<MountedHandle, MountError> {
            container.append(&frame);
            let frame = frame.clone();
            Ok(MountedHandle::new(NAME, move || {
                frame.remove();
                Ok(())
            }))
        };

        Editor::new(mount, apply)
    })
}
