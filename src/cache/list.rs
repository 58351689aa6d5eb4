//! Ordered Entry List Module
//!
//! Circular doubly-linked list stored in an arena, ordered by recency.
//!
//! Slot 0 is the root sentinel: `root.next` is the front (most recently
//! used), `root.prev` is the back (least recently used), and the list is
//! empty when the root points at itself. Handles carry the owning list's tag
//! and the slot generation, so a handle to a removed node never resolves to
//! whatever reuses its slot.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ListError;

const ROOT: usize = 0;

static NEXT_LIST_TAG: AtomicU32 = AtomicU32::new(1);

fn next_tag() -> u32 {
    NEXT_LIST_TAG.fetch_add(1, Ordering::Relaxed)
}

// == Node Handle ==
/// Handle to a node of an `EntryList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    list: u32,
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Node<T> {
    prev: usize,
    next: usize,
    generation: u32,
    linked: bool,
    value: Option<T>,
}

impl<T> Node<T> {
    fn root() -> Self {
        Self {
            prev: ROOT,
            next: ROOT,
            generation: 0,
            linked: false,
            value: None,
        }
    }
}

// == Entry List ==
/// Recency-ordered list with O(1) structural operations given a `NodeId`.
#[derive(Debug)]
pub struct EntryList<T> {
    tag: u32,
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for EntryList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryList<T> {
    // == Constructor ==
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(Node::root());
        Self {
            tag: next_tag(),
            nodes,
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].next == ROOT
    }

    // == Front / Back ==
    /// Most recently used node, or `None` when empty.
    pub fn front(&self) -> Option<NodeId> {
        self.id_at(self.nodes[ROOT].next)
    }

    /// Least recently used node, or `None` when empty.
    pub fn back(&self) -> Option<NodeId> {
        self.id_at(self.nodes[ROOT].prev)
    }

    /// Node after `id` (one step towards the back).
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let index = self.linked_index(id)?;
        self.id_at(self.nodes[index].next)
    }

    /// Node before `id` (one step towards the front).
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let index = self.linked_index(id)?;
        self.id_at(self.nodes[index].prev)
    }

    // == Access ==
    pub fn get(&self, id: NodeId) -> Option<&T> {
        let index = self.resolve(id)?;
        self.nodes[index].value.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        let index = self.resolve(id)?;
        self.nodes[index].value.as_mut()
    }

    /// Returns true if `id` is a live node currently linked into this list.
    pub fn contains(&self, id: NodeId) -> bool {
        self.linked_index(id).is_some()
    }

    // == Insert ==
    /// Allocates a node for `value` and links it at the front.
    pub fn insert_front(&mut self, value: T) -> NodeId {
        let index = self.alloc(value);
        self.link_after(index, ROOT);
        self.id_of(index)
    }

    /// Allocates a node for `value` and links it at the back.
    pub fn insert_back(&mut self, value: T) -> NodeId {
        let index = self.alloc(value);
        let tail = self.nodes[ROOT].prev;
        self.link_after(index, tail);
        self.id_of(index)
    }

    /// Relinks a detached node at the front.
    ///
    /// Fails if the node is still linked; callers must `detach` it first.
    pub fn push_front(&mut self, id: NodeId) -> Result<(), ListError> {
        let index = self.resolve(id).ok_or(ListError::StaleNode)?;
        if self.nodes[index].linked {
            return Err(ListError::AlreadyLinked);
        }
        self.link_after(index, ROOT);
        Ok(())
    }

    // == Remove ==
    /// Unlinks a node but keeps its slot and value; returns false if the node
    /// was not linked into this list.
    pub fn detach(&mut self, id: NodeId) -> bool {
        match self.linked_index(id) {
            Some(index) => {
                self.unlink(index);
                true
            }
            None => false,
        }
    }

    /// Unlinks and frees a node, returning its value.
    ///
    /// Returns `None` for foreign or already removed handles.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let index = self.resolve(id)?;
        if self.nodes[index].linked {
            self.unlink(index);
        }
        let node = &mut self.nodes[index];
        let value = node.value.take();
        node.generation = node.generation.wrapping_add(1);
        self.free.push(index);
        value
    }

    /// Removes the back node and returns its value.
    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.back()?;
        self.remove(id)
    }

    // == Move ==
    /// Moves a linked node to the front; no-op if it is already there.
    ///
    /// Returns false if `id` is not linked into this list.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        let Some(index) = self.linked_index(id) else {
            return false;
        };
        if self.nodes[ROOT].next != index {
            self.unlink(index);
            self.link_after(index, ROOT);
        }
        true
    }

    /// Moves a linked node to the back; no-op if it is already there.
    pub fn move_to_back(&mut self, id: NodeId) -> bool {
        let Some(index) = self.linked_index(id) else {
            return false;
        };
        if self.nodes[ROOT].prev != index {
            self.unlink(index);
            let tail = self.nodes[ROOT].prev;
            self.link_after(index, tail);
        }
        true
    }

    // == Clear ==
    /// Drops every node. All outstanding handles become stale.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT] = Node::root();
        self.free.clear();
        self.len = 0;
        self.tag = next_tag();
    }

    // == Iteration ==
    /// Iterates front (most recent) to back (least recent).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            head: self.nodes[ROOT].next,
            tail: self.nodes[ROOT].prev,
            remaining: self.len,
        }
    }

    // == Internal linking ==
    fn alloc(&mut self, value: T) -> usize {
        match self.free.pop() {
            Some(index) => {
                let node = &mut self.nodes[index];
                node.value = Some(value);
                node.prev = index;
                node.next = index;
                index
            }
            None => {
                let index = self.nodes.len();
                self.nodes.push(Node {
                    prev: index,
                    next: index,
                    generation: 0,
                    linked: false,
                    value: Some(value),
                });
                index
            }
        }
    }

    fn link_after(&mut self, index: usize, at: usize) {
        let next = self.nodes[at].next;
        self.nodes[index].prev = at;
        self.nodes[index].next = next;
        self.nodes[index].linked = true;
        self.nodes[at].next = index;
        self.nodes[next].prev = index;
        self.len += 1;
    }

    fn unlink(&mut self, index: usize) {
        let prev = self.nodes[index].prev;
        let next = self.nodes[index].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        let node = &mut self.nodes[index];
        node.prev = index;
        node.next = index;
        node.linked = false;
        self.len -= 1;
    }

    fn id_of(&self, index: usize) -> NodeId {
        NodeId {
            list: self.tag,
            index,
            generation: self.nodes[index].generation,
        }
    }

    fn id_at(&self, index: usize) -> Option<NodeId> {
        (index != ROOT).then(|| self.id_of(index))
    }

    fn resolve(&self, id: NodeId) -> Option<usize> {
        if id.list != self.tag || id.index == ROOT {
            return None;
        }
        let node = self.nodes.get(id.index)?;
        (node.generation == id.generation && node.value.is_some()).then_some(id.index)
    }

    fn linked_index(&self, id: NodeId) -> Option<usize> {
        self.resolve(id).filter(|&index| self.nodes[index].linked)
    }
}

// == Iterator ==
/// Double-ended iterator over `(NodeId, &T)` in recency order.
pub struct Iter<'a, T> {
    list: &'a EntryList<T>,
    head: usize,
    tail: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.head;
        let node = &self.list.nodes[index];
        self.head = node.next;
        self.remaining -= 1;
        Some((self.list.id_at(index)?, node.value.as_ref()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.tail;
        let node = &self.list.nodes[index];
        self.tail = node.prev;
        self.remaining -= 1;
        Some((self.list.id_at(index)?, node.value.as_ref()?))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn values<T: Copy>(list: &EntryList<T>) -> Vec<T> {
        list.iter().map(|(_, v)| *v).collect()
    }

    #[test]
    fn test_list_new_is_empty() {
        let list: EntryList<u32> = EntryList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.front().is_none());
        assert!(list.back().is_none());
    }

    #[test]
    fn test_insert_front_orders_by_recency() {
        let mut list = EntryList::new();
        list.insert_front(1);
        list.insert_front(2);
        list.insert_front(3);

        assert_eq!(values(&list), vec![3, 2, 1]);
        assert_eq!(list.get(list.front().unwrap()), Some(&3));
        assert_eq!(list.get(list.back().unwrap()), Some(&1));
    }

    #[test]
    fn test_single_element_is_front_and_back() {
        let mut list = EntryList::new();
        let id = list.insert_front("only");

        assert_eq!(list.front(), Some(id));
        assert_eq!(list.back(), Some(id));
        assert!(list.next(id).is_none());
        assert!(list.prev(id).is_none());
    }

    #[test]
    fn test_move_to_front() {
        let mut list = EntryList::new();
        let a = list.insert_front('a');
        list.insert_front('b');
        list.insert_front('c');

        assert!(list.move_to_front(a));
        assert_eq!(values(&list), vec!['a', 'c', 'b']);

        // Already at the front
        assert!(list.move_to_front(a));
        assert_eq!(values(&list), vec!['a', 'c', 'b']);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_move_to_back() {
        let mut list = EntryList::new();
        list.insert_back(1);
        let b = list.insert_back(2);
        list.insert_back(3);

        assert!(list.move_to_back(b));
        assert_eq!(values(&list), vec![1, 3, 2]);
    }

    #[test]
    fn test_remove_middle_and_double_remove() {
        let mut list = EntryList::new();
        list.insert_back(1);
        let b = list.insert_back(2);
        list.insert_back(3);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(values(&list), vec![1, 3]);
        assert_eq!(list.len(), 2);

        assert_eq!(list.remove(b), None);
        assert!(!list.move_to_front(b));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_stale_handle_does_not_resolve_after_slot_reuse() {
        let mut list = EntryList::new();
        let old = list.insert_front(10);
        list.remove(old);

        let new = list.insert_front(20);
        assert_ne!(old, new);
        assert!(list.get(old).is_none());
        assert_eq!(list.get(new), Some(&20));
    }

    #[test]
    fn test_push_front_requires_detached_node() {
        let mut list = EntryList::new();
        let a = list.insert_back(1);
        list.insert_back(2);

        assert_eq!(list.push_front(a), Err(ListError::AlreadyLinked));

        assert!(list.detach(a));
        assert!(!list.contains(a));
        assert_eq!(list.len(), 1);
        assert!(!list.detach(a));

        list.push_front(a).unwrap();
        assert_eq!(values(&list), vec![1, 2]);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut first = EntryList::new();
        let mut second = EntryList::new();
        let id = first.insert_front(1);
        second.insert_front(2);

        assert!(second.get(id).is_none());
        assert!(second.remove(id).is_none());
        assert_eq!(second.push_front(id), Err(ListError::StaleNode));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_pop_back() {
        let mut list = EntryList::new();
        list.insert_front(1);
        list.insert_front(2);

        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut list = EntryList::new();
        let a = list.insert_front(1);
        list.insert_front(2);

        list.clear();
        assert!(list.is_empty());
        assert!(list.get(a).is_none());

        let b = list.insert_front(3);
        assert!(list.get(a).is_none());
        assert_eq!(list.get(b), Some(&3));
    }

    #[test]
    fn test_walk_from_back_with_prev() {
        let mut list = EntryList::new();
        for i in 0..4 {
            list.insert_front(i);
        }

        let mut seen = Vec::new();
        let mut cursor = list.back();
        while let Some(id) = cursor {
            seen.push(*list.get(id).unwrap());
            cursor = list.prev(id);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_iter_double_ended() {
        let mut list = EntryList::new();
        for i in 0..5 {
            list.insert_back(i);
        }

        let reversed: Vec<_> = list.iter().rev().map(|(_, v)| *v).collect();
        assert_eq!(reversed, vec![4, 3, 2, 1, 0]);

        let mut iter = list.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next().map(|(_, v)| *v), Some(0));
        assert_eq!(iter.next_back().map(|(_, v)| *v), Some(4));
        assert_eq!(iter.len(), 3);
    }

    #[test]
    fn test_get_mut() {
        let mut list = EntryList::new();
        let id = list.insert_front(String::from("a"));
        list.get_mut(id).unwrap().push('b');
        assert_eq!(list.get(id).map(String::as_str), Some("ab"));
    }
}
