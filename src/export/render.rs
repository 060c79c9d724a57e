//! Plain-text rendering of posts with Handlebars templates
//!
//! Two templates ship with the crate:
//!
//! - `post` - the `post.md` file of a directory archive
//! - `book_entry` - one entry of the single-document text book

use handlebars::Handlebars;
use serde::Serialize;

use crate::models::{hive_timestamp, Post};
use crate::utils::error::ExportError;
use crate::utils::truncate_chars;

const POST_TEMPLATE: &str = include_str!("../../templates/post.hbs");
const BOOK_ENTRY_TEMPLATE: &str = include_str!("../../templates/book_entry.hbs");

/// Longest title shown in a book entry heading
pub const HEADING_TITLE_LEN: usize = 80;

#[derive(Debug, Serialize)]
struct PostTemplateData<'a> {
    title: &'a str,
    created: String,
    tags: String,
    body: &'a str,
}

impl<'a> From<&'a Post> for PostTemplateData<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            title: &post.title,
            created: post.created.format(hive_timestamp::FORMAT).to_string(),
            tags: post.metadata().tags_line(),
            body: &post.body,
        }
    }
}

#[derive(Debug, Serialize)]
struct BookEntryData<'a> {
    index: usize,
    title: &'a str,
    body: &'a str,
}

/// Renders posts to text
pub struct PostRenderer {
    handlebars: Handlebars<'static>,
}

impl PostRenderer {
    pub fn new() -> Result<Self, ExportError> {
        let mut handlebars = Handlebars::new();

        // Output is plain text, never HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string("post", POST_TEMPLATE)
            .map_err(Box::new)?;
        handlebars
            .register_template_string("book_entry", BOOK_ENTRY_TEMPLATE)
            .map_err(Box::new)?;

        Ok(Self { handlebars })
    }

    /// Render the `post.md` document: title, date and tags header, then the body
    pub fn render_post(&self, post: &Post) -> Result<String, ExportError> {
        Ok(self
            .handlebars
            .render("post", &PostTemplateData::from(post))?)
    }

    /// Render one book entry headed `#<index>: <title>`
    pub fn render_book_entry(&self, index: usize, post: &Post) -> Result<String, ExportError> {
        let data = BookEntryData {
            index,
            title: truncate_chars(&post.title, HEADING_TITLE_LEN),
            body: &post.body,
        };
        Ok(self.handlebars.render("book_entry", &data)?)
    }
}
