use std::collections::BTreeMap;

use crate::config::ListConfig;
use crate::element::ListElement;
use crate::error::InputError;
use crate::sources::ResolvedItem;
use crate::types::ElementKind;

/// Per-list configuration: which variant the list holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ListTypeDescriptor {
    pub name: String,
    pub kind: ElementKind,
}

impl ListTypeDescriptor {
    /// Build an unsaved element of this list's variant from resolved metadata.
    pub fn element_from(&self, url: &str, item: ResolvedItem) -> ListElement {
        ListElement::from_resolved(&self.name, self.kind, url, item)
    }

    /// Build an element from manual entry. Manually entered items are generic:
    /// their rating came from the user and is not re-fetched.
    pub fn manual_element(&self, url: &str, name: &str, description: &str, rating: f64) -> ListElement {
        ListElement::new(&self.name, ElementKind::Generic, url, name, description, rating)
    }
}

/// Registered lists by lowercase name. Read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct ListRegistry {
    lists: BTreeMap<String, ListTypeDescriptor>,
}

impl ListRegistry {
    pub fn from_config(lists: &[ListConfig]) -> Self {
        let lists = lists
            .iter()
            .filter(|l| !l.name.trim().is_empty())
            .map(|l| {
                let name = normalize_list_name(&l.name);
                (name.clone(), ListTypeDescriptor { name, kind: l.kind })
            })
            .collect();
        Self { lists }
    }

    /// Sorted list names.
    pub fn list_names(&self) -> Vec<String> { self.lists.keys().cloned().collect() }

    pub fn descriptor_for(&self, name: &str) -> Option<&ListTypeDescriptor> {
        self.lists.get(&normalize_list_name(name))
    }

    /// Like `descriptor_for`, but an unknown name is an input error.
    pub fn validate(&self, name: &str) -> Result<&ListTypeDescriptor, InputError> {
        self.descriptor_for(name).ok_or_else(|| InputError::UnknownList(normalize_list_name(name)))
    }
}

pub fn normalize_list_name(name: &str) -> String { name.trim().to_lowercase() }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_lists;

    #[test]
    fn names_are_case_insensitive() {
        let registry = ListRegistry::from_config(&default_lists());
        assert_eq!(registry.list_names(), vec!["articles", "books", "movies", "shows"]);
        assert_eq!(registry.descriptor_for("Movies").unwrap().kind, ElementKind::Movie);
        assert_eq!(registry.validate(" BOOKS ").unwrap().name, "books");
        assert_eq!(registry.validate("games"), Err(InputError::UnknownList("games".into())));
    }

    #[test]
    fn descriptor_builds_its_variant() {
        let registry = ListRegistry::from_config(&[ListConfig::new("Films", ElementKind::Movie), ListConfig::new(" ", ElementKind::Book)]);
        assert_eq!(registry.list_names(), vec!["films"]);
        let d = registry.descriptor_for("films").unwrap();
        let e = d.element_from("https://a.example/1", ResolvedItem { name: "Heat".into(), description: "".into(), rating: 8.3 });
        assert_eq!(e.kind, ElementKind::Movie);
        assert_eq!(e.list_name, "films");
        assert_eq!(e.description, "N/A");
        let m = d.manual_element("https://x.example", "Thing", "desc", 7.0);
        assert_eq!(m.kind, ElementKind::Generic);
        assert_eq!(m.rating, 7.0);
    }
}
