use anyhow::Result;
use async_trait::async_trait;

use crate::element::ListElement;
use crate::types::{Field, StatusFilter};

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert an unsaved element and return it with its new id. Elements that
    /// already carry an id are rejected; use `update_field` to change them.
    async fn save(&self, element: &ListElement) -> Result<ListElement>;
    async fn load(&self, list_name: &str, id: i64) -> Result<Option<ListElement>>;
    /// Elements of a list admitted by `filter`, in insertion order.
    async fn load_all(&self, list_name: &str, filter: StatusFilter) -> Result<Vec<ListElement>>;
    /// Returns false when no stored row matched.
    async fn update_field(&self, element: &ListElement, field: Field) -> Result<bool>;
}
