//! Rendering configuration.

use std::collections::HashMap;

use serde::Deserialize;

/// Class of the wrapper `div` consumers select on.
pub const DEFAULT_CONTAINER_CLASS: &str = "markdown-body";

/// Options for [`Renderer`](crate::render::Renderer).
///
/// The defaults reproduce [`render_markdown_to_html`](crate::render_markdown_to_html).
///
/// ```rust
/// use lessonmark_core::{RenderOptions, Renderer};
///
/// let renderer = Renderer::new(RenderOptions::default().with_wrap(false));
/// assert_eq!(renderer.render("# Hi"), "<h1>Hi</h1>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Class of the wrapper `div`.
    pub container_class: String,
    /// Wrap the rendered blocks in the container `div`.
    pub wrap: bool,
    /// Recognize a `---` front matter block at the start of the document.
    pub front_matter: bool,
    /// Persisted checkbox state keyed by `data-task-id`.
    pub task_state: HashMap<String, bool>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            container_class: DEFAULT_CONTAINER_CLASS.to_string(),
            wrap: true,
            front_matter: true,
            task_state: HashMap::new(),
        }
    }
}

impl RenderOptions {
    pub fn with_container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = class.into();
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn with_front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }

    pub fn with_task_state(mut self, task_state: HashMap<String, bool>) -> Self {
        self.task_state = task_state;
        self
    }

    /// Record the state of one task checkbox.
    pub fn set_task(mut self, task_id: impl Into<String>, checked: bool) -> Self {
        self.task_state.insert(task_id.into(), checked);
        self
    }
}
