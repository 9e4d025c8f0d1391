//! Playlist records, the playlist catalogue result and the nested tree view

use super::outcome::CatalogueResult;
use super::track::TrackKey;
use crate::library::LibrarySink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Folder or leaf playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    /// Holds other playlists, no members of its own
    Folder,
    /// Holds an ordered list of tracks
    Leaf,
}

/// Internal catalogue playlist record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Stable id declared by the source
    pub persistent_id: String,
    /// Containing folder, `None` for top-level playlists
    pub parent_id: Option<String>,
    pub name: String,
    pub kind: PlaylistKind,
    /// Member tracks, in declared order
    pub members: Vec<TrackKey>,
    /// Position of the entry in the source document
    pub position: usize,
}

/// Keyed playlist records plus a parent → children index
#[derive(Debug, Clone, Default)]
pub struct PlaylistCatalogue {
    playlists: HashMap<String, Playlist>,
    children: BTreeMap<String, BTreeSet<String>>,
}

/// One node of the rebuilt playlist hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistNode {
    pub playlist: Playlist,
    pub children: Vec<PlaylistNode>,
}

impl PlaylistNode {
    /// Find a node by name anywhere below (and including) this one
    pub fn find(&self, name: &str) -> Option<&PlaylistNode> {
        if self.playlist.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Depth of the deepest path starting at this node (a leaf is 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(PlaylistNode::depth).max().unwrap_or(0)
    }
}

impl PlaylistCatalogue {
    pub fn get(&self, persistent_id: &str) -> Option<&Playlist> {
        self.playlists.get(persistent_id)
    }

    pub fn playlists(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.values()
    }

    /// Child ids declared under a parent
    pub fn children_of(&self, parent_id: &str) -> Option<&BTreeSet<String>> {
        self.children.get(parent_id)
    }

    /// Playlists ordered by their source position
    pub fn ordered(&self) -> Vec<&Playlist> {
        let mut ordered: Vec<&Playlist> = self.playlists.values().collect();
        ordered.sort_by_key(|p| p.position);
        ordered
    }

    /// Rebuild the nested hierarchy
    ///
    /// Roots are playlists without a parent, or whose parent is not part of
    /// this catalogue. Siblings are ordered by source position, so the tree
    /// is independent of the order branches were merged in.
    pub fn tree(&self) -> Vec<PlaylistNode> {
        let mut visited = HashSet::new();
        let roots: Vec<&Playlist> = self
            .ordered()
            .into_iter()
            .filter(|p| match &p.parent_id {
                None => true,
                Some(parent) => !self.playlists.contains_key(parent),
            })
            .collect();

        roots
            .into_iter()
            .filter_map(|root| self.build_node(root, &mut visited))
            .collect()
    }

    fn build_node(&self, playlist: &Playlist, visited: &mut HashSet<String>) -> Option<PlaylistNode> {
        if !visited.insert(playlist.persistent_id.clone()) {
            return None;
        }

        let mut children: Vec<&Playlist> = self
            .children
            .get(&playlist.persistent_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.playlists.get(id))
            .collect();
        children.sort_by_key(|p| p.position);

        let children = children
            .into_iter()
            .filter_map(|child| self.build_node(child, visited))
            .collect();

        Some(PlaylistNode {
            playlist: playlist.clone(),
            children,
        })
    }
}

impl CatalogueResult for PlaylistCatalogue {
    type Record = Playlist;

    fn insert(&mut self, record: Playlist) -> bool {
        if self.playlists.contains_key(&record.persistent_id) {
            return false;
        }
        if let Some(parent) = &record.parent_id {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(record.persistent_id.clone());
        }
        self.playlists.insert(record.persistent_id.clone(), record);
        true
    }

    fn merge(&mut self, other: Self) -> usize {
        let mut skipped = HashSet::new();
        for (id, playlist) in other.playlists {
            if self.playlists.contains_key(&id) {
                skipped.insert(id);
                continue;
            }
            self.playlists.insert(id, playlist);
        }
        for (parent, ids) in other.children {
            let accepted: Vec<String> = ids
                .into_iter()
                .filter(|id| !skipped.contains(id))
                .collect();
            if !accepted.is_empty() {
                self.children.entry(parent).or_default().extend(accepted);
            }
        }
        skipped.len()
    }

    fn len(&self) -> usize {
        self.playlists.len()
    }

    fn deliver(&self, sink: &dyn LibrarySink, _priority: bool) {
        sink.add_playlists(&self.ordered());
    }
}
