use crate::dao::{EntryInsert, EntryRow};
use crate::element::ListElement;
use crate::types::ElementKind;

pub fn entry_insert_from_element(e: &ListElement) -> EntryInsert {
    EntryInsert {
        list_name: e.list_name.clone(),
        kind: e.kind.as_str().to_string(),
        name: e.name.clone(),
        url: e.url.clone(),
        description: e.description.clone(),
        rating: e.rating,
        was_viewed: e.was_viewed as i64,
        was_removed: e.was_removed as i64,
    }
}

pub fn element_from_row(row: EntryRow) -> ListElement {
    let (id, list_name, kind, name, url, description, rating, was_viewed, was_removed) = row;
    ListElement {
        id: Some(id),
        list_name,
        kind: ElementKind::parse(&kind),
        name,
        url,
        description,
        rating,
        was_viewed: was_viewed != 0,
        was_removed: was_removed != 0,
    }
}
