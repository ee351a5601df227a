//! Concrete implementations chosen for abstract container types.

use tessera_ir::introspect::TypeIntrospector;
use tessera_ir::typename::{erasure, simple_name};

const COLLECTIONS: &[(&str, &str)] = &[
    ("java.lang.Iterable", "java.util.ArrayList"),
    ("java.util.Collection", "java.util.ArrayList"),
    ("java.util.List", "java.util.ArrayList"),
    ("java.util.AbstractList", "java.util.ArrayList"),
    ("java.util.Set", "java.util.HashSet"),
    ("java.util.AbstractSet", "java.util.HashSet"),
    ("java.util.SortedSet", "java.util.TreeSet"),
    ("java.util.NavigableSet", "java.util.TreeSet"),
    ("java.util.Queue", "java.util.LinkedList"),
    ("java.util.Deque", "java.util.LinkedList"),
];

const MAPS: &[(&str, &str)] = &[
    ("java.util.Map", "java.util.HashMap"),
    ("java.util.AbstractMap", "java.util.HashMap"),
    ("java.util.SortedMap", "java.util.TreeMap"),
    ("java.util.NavigableMap", "java.util.TreeMap"),
];

/// Erased concrete collection class for a requested collection type.
///
/// Instantiable classes stand for themselves; unrecognized abstract types
/// fall back to `HashSet` when named like a set and `ArrayList` otherwise.
pub fn collection_impl(type_name: &str, introspector: &dyn TypeIntrospector) -> String {
    let erased = erasure(type_name);
    if let Some((_, concrete)) = COLLECTIONS.iter().find(|(abs, _)| *abs == erased) {
        return concrete.to_string();
    }
    if is_instantiable(&erased, introspector) {
        return erased;
    }
    if simple_name(&erased).contains("Set") {
        "java.util.HashSet".to_string()
    } else {
        "java.util.ArrayList".to_string()
    }
}

/// Erased concrete map class for a requested map type.
pub fn map_impl(type_name: &str, introspector: &dyn TypeIntrospector) -> String {
    let erased = erasure(type_name);
    if let Some((_, concrete)) = MAPS.iter().find(|(abs, _)| *abs == erased) {
        return concrete.to_string();
    }
    if is_instantiable(&erased, introspector) {
        return erased;
    }
    if simple_name(&erased).contains("Sorted") {
        "java.util.TreeMap".to_string()
    } else {
        "java.util.HashMap".to_string()
    }
}

/// The implementation table's choice for an abstract scalar type, if any.
pub fn known_impl(type_name: &str) -> Option<&'static str> {
    let erased = erasure(type_name);
    COLLECTIONS
        .iter()
        .chain(MAPS)
        .find(|(abs, _)| *abs == erased)
        .map(|(_, concrete)| *concrete)
}

fn is_instantiable(erased: &str, introspector: &dyn TypeIntrospector) -> bool {
    introspector
        .type_info(erased)
        .is_some_and(|info| info.is_instantiable())
}
