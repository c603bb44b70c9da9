use parking_lot::RwLock;

/// Receives page-title updates for allowed navigations.
pub trait TitleSink: Send + Sync {
    fn set_title(&self, title: &str);
}

/// In-memory document title.
#[derive(Debug, Default)]
pub struct DocumentTitle {
    current: RwLock<String>,
    history: RwLock<Vec<String>>,
}

impl DocumentTitle {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> String { self.current.read().clone() }

    pub fn history(&self) -> Vec<String> { self.history.read().clone() }
}

impl TitleSink for DocumentTitle {
    fn set_title(&self, title: &str) {
        *self.current.write() = title.to_string();
        self.history.write().push(title.to_string());
    }
}
