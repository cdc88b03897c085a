//! In-memory document: the arena of indirect objects plus the trailer.

use super::objects::{Dict, ObjectId, PDFObject};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Page-tree nesting bound; deeper trees are treated as malformed.
const MAX_PAGE_TREE_DEPTH: usize = 256;

static NULL: PDFObject = PDFObject::Null;

/// A decoded PDF document.
///
/// Owns every indirect object. References are lookups by [`ObjectId`];
/// a reference with no target resolves to null.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Header version, e.g. `(1, 7)`.
    pub version: (u8, u8),
    /// Indirect objects keyed by id.
    pub objects: BTreeMap<ObjectId, PDFObject>,
    /// Trailer dictionary (`Root`, `Info`, `ID`, ...).
    pub trailer: Dict,
}

impl Document {
    pub fn new(version: (u8, u8)) -> Self {
        Self {
            version,
            objects: BTreeMap::new(),
            trailer: Dict::new(),
        }
    }

    /// Get an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&PDFObject> {
        self.objects.get(&id)
    }

    /// Follow references until a direct object is reached. Dangling or
    /// cyclic reference chains resolve to null.
    pub fn resolve<'a>(&'a self, obj: &'a PDFObject) -> &'a PDFObject {
        let mut current = obj;
        let mut seen = HashSet::new();
        while let PDFObject::Ref(id) = current {
            if !seen.insert(*id) {
                return &NULL;
            }
            current = self.objects.get(id).unwrap_or(&NULL);
        }
        current
    }

    /// Resolve a dictionary entry.
    pub fn resolve_key<'a>(&'a self, dict: &'a Dict, key: &str) -> Option<&'a PDFObject> {
        dict.get(key)
            .map(|v| self.resolve(v))
            .filter(|v| !v.is_null())
    }

    /// Id of the document catalog.
    pub fn root_id(&self) -> Option<ObjectId> {
        self.trailer.get("Root").and_then(|r| r.as_ref().ok())
    }

    /// The document catalog dictionary.
    pub fn catalog(&self) -> Option<&Dict> {
        self.trailer
            .get("Root")
            .and_then(|r| self.resolve(r).as_dict().ok())
    }

    /// Largest object number in use.
    pub fn max_objid(&self) -> u32 {
        self.objects.keys().next_back().map_or(0, |id| id.objid)
    }

    /// Add an object under the next free number.
    pub fn add_object(&mut self, obj: impl Into<PDFObject>) -> ObjectId {
        let id = ObjectId::new(self.max_objid() + 1, 0);
        self.objects.insert(id, obj.into());
        id
    }

    /// Leaf page ids in document order.
    ///
    /// The walk keeps a visited set so a malformed tree whose `Kids` point back
    /// at an ancestor terminates.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        let mut pages = Vec::new();
        let Some(root) = self.catalog().and_then(|c| c.get("Pages")) else {
            return pages;
        };
        let Ok(root_id) = root.as_ref() else {
            return pages;
        };
        let mut visited = HashSet::new();
        let mut stack = vec![(root_id, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_PAGE_TREE_DEPTH || !visited.insert(id) {
                continue;
            }
            let Some(node) = self.get(id).and_then(|o| o.as_dict().ok()) else {
                continue;
            };
            let is_leaf = match node.get("Type").and_then(|t| t.as_name().ok()) {
                Some("Page") => true,
                Some("Pages") => false,
                _ => !node.contains_key("Kids"),
            };
            if is_leaf {
                pages.push(id);
                continue;
            }
            if let Some(PDFObject::Array(kids)) = self.resolve_key(node, "Kids") {
                for kid in kids.iter().rev() {
                    if let Ok(kid_id) = kid.as_ref() {
                        stack.push((kid_id, depth + 1));
                    }
                }
            }
        }
        pages
    }

    /// Ids reachable from `start`, in breadth-first discovery order.
    ///
    /// `stop` prunes traversal: a node for which it returns true is recorded
    /// but its references are not followed.
    pub fn reachable_from(
        &self,
        start: impl IntoIterator<Item = ObjectId>,
        mut stop: impl FnMut(ObjectId, &PDFObject) -> bool,
    ) -> Vec<ObjectId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: std::collections::VecDeque<ObjectId> = start.into_iter().collect();
        while let Some(id) = queue.pop_front() {
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            if stop(id, obj) {
                continue;
            }
            obj.for_each_ref(&mut |r| {
                if !visited.contains(&r) {
                    queue.push_back(r);
                }
            });
        }
        order
    }

    /// Ids reachable from the trailer's indirect entries.
    pub fn reachable(&self) -> HashSet<ObjectId> {
        let mut roots = Vec::new();
        for value in self.trailer.values() {
            value.for_each_ref(&mut |r| roots.push(r));
        }
        self.reachable_from(roots, |_, _| false)
            .into_iter()
            .collect()
    }

    /// Drop unreachable objects and renumber the rest densely from 1 with
    /// generation 0, in ascending order of their current ids. References to
    /// missing objects become null. Returns the number of dropped objects.
    pub fn compact(&mut self) -> usize {
        let reachable = self.reachable();
        let before = self.objects.len();
        let old = std::mem::take(&mut self.objects);

        let mut mapping = HashMap::with_capacity(reachable.len());
        let mut next = 1u32;
        for id in old.keys() {
            if reachable.contains(id) {
                mapping.insert(*id, ObjectId::new(next, 0));
                next += 1;
            }
        }

        let mut rewrite = |id: ObjectId| match mapping.get(&id) {
            Some(new_id) => PDFObject::Ref(*new_id),
            None => PDFObject::Null,
        };
        for (id, mut obj) in old {
            if let Some(new_id) = mapping.get(&id).copied() {
                obj.map_refs(&mut rewrite);
                self.objects.insert(new_id, obj);
            }
        }
        for value in self.trailer.values_mut() {
            value.map_refs(&mut rewrite);
        }
        before - self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;
    use crate::model::objects::name;

    fn two_page_doc() -> Document {
        let mut doc = Document::new((1, 4));
        let catalog = ObjectId::new(1, 0);
        let pages = ObjectId::new(2, 0);
        doc.objects.insert(
            catalog,
            dict! { "Type" => name("Catalog"), "Pages" => pages }.into(),
        );
        doc.objects.insert(
            pages,
            dict! {
                "Type" => name("Pages"),
                "Kids" => PDFObject::Array(vec![ObjectId::new(5, 0).into(), ObjectId::new(7, 0).into()]),
                "Count" => 2i64,
            }
            .into(),
        );
        for id in [5, 7] {
            doc.objects.insert(
                ObjectId::new(id, 0),
                dict! { "Type" => name("Page"), "Parent" => pages }.into(),
            );
        }
        doc.objects
            .insert(ObjectId::new(9, 0), dict! { "Orphan" => 1i64 }.into());
        doc.trailer.insert("Root".into(), catalog.into());
        doc
    }

    #[test]
    fn page_ids_follow_kids_order_despite_parent_cycle() {
        let doc = two_page_doc();
        let pages: Vec<u32> = doc.page_ids().iter().map(|id| id.objid).collect();
        assert_eq!(pages, vec![5, 7]);
    }

    #[test]
    fn compact_drops_orphans_and_renumbers() {
        let mut doc = two_page_doc();
        let dropped = doc.compact();
        assert_eq!(dropped, 1);
        let ids: Vec<u32> = doc.objects.keys().map(|id| id.objid).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let pages: Vec<u32> = doc.page_ids().iter().map(|id| id.objid).collect();
        assert_eq!(pages, vec![3, 4]);
    }

    #[test]
    fn compact_is_stable_on_dense_documents() {
        let mut doc = two_page_doc();
        doc.compact();
        let snapshot = doc.objects.clone();
        assert_eq!(doc.compact(), 0);
        assert_eq!(doc.objects, snapshot);
    }

    #[test]
    fn resolve_breaks_reference_cycles() {
        let mut doc = Document::new((1, 4));
        doc.objects
            .insert(ObjectId::new(1, 0), ObjectId::new(2, 0).into());
        doc.objects
            .insert(ObjectId::new(2, 0), ObjectId::new(1, 0).into());
        let start = PDFObject::Ref(ObjectId::new(1, 0));
        assert!(doc.resolve(&start).is_null());
    }
}
