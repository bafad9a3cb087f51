#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),
}
