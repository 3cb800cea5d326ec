//! tracker.rs — Association allocation → pile d'appels
//!
//! Rôle :
//! - Posséder l'arbre des piles (créé à l'activation, détruit d'un bloc à la
//!   désactivation)
//! - À chaque allocation, photographier le head courant et l'associer à
//!   l'objet ; c'est le seul consommateur du head côté GC
//! - Rendre les piles lisibles pour le profiler
//!
//! La désactivation exige une pile vide (head à la racine) : désactiver en
//! plein appel est un bug d'intégration, pas un cas supporté.

use std::collections::HashMap;

use crate::tree::{CallFrameInfo, NodeId, StackTracesTree};

/// Identifiant opaque d'un objet du tas, fourni par le GC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// Suivi des sites d'allocation. Inactif par défaut.
#[derive(Debug, Default)]
pub struct AllocationLocationTracker {
    tree: Option<StackTracesTree>,
    /// objet vivant → nœud actif au moment de son allocation
    allocs: HashMap<ObjectId, NodeId>,
}

impl AllocationLocationTracker {
    /// Crée un tracker inactif.
    pub fn new() -> Self { Self::default() }

    /// Vrai si le suivi est actif.
    pub fn is_enabled(&self) -> bool { self.tree.is_some() }

    /// Active le suivi depuis une pile vide (démarrage de programme).
    /// Sans effet si déjà actif.
    pub fn enable(&mut self) {
        if self.tree.is_none() {
            #[cfg(feature = "trace")]
            log::debug!("allocation location tracking enabled");
            self.tree = Some(StackTracesTree::new());
        }
    }

    /// Active le suivi alors que des appels sont déjà en cours : reconstruit
    /// la chaîne d'ancêtres depuis `frames` (le plus externe d'abord).
    pub fn enable_mid_stack(&mut self, frames: &[CallFrameInfo<'_>]) {
        if self.tree.is_some() {
            return;
        }
        #[cfg(feature = "trace")]
        log::debug!("allocation location tracking enabled mid-stack ({} frames)", frames.len());
        let mut tree = StackTracesTree::new();
        tree.sync_with_runtime_stack(frames);
        self.tree = Some(tree);
    }

    /// Désactive le suivi : libère l'arène entière et les associations.
    /// Exige head à la racine.
    pub fn disable(&mut self) {
        if let Some(tree) = self.tree.take() {
            assert!(tree.is_head_at_root(), "cannot disable tracking mid-stack");
            #[cfg(feature = "trace")]
            log::debug!("allocation location tracking disabled, {} nodes freed", tree.node_count());
        }
        self.allocs.clear();
    }

    /// Arbre actif (lecture), si le suivi est en route.
    pub fn tree(&self) -> Option<&StackTracesTree> { self.tree.as_ref() }

    /// Arbre actif (mutation) — côté interpréteur : push/pop des frames.
    pub fn tree_mut(&mut self) -> Option<&mut StackTracesTree> { self.tree.as_mut() }

    /// Nouvelle allocation : associe `object` au nœud actif courant.
    /// Sans effet quand le suivi est inactif.
    pub fn record_alloc(&mut self, object: ObjectId) {
        if let Some(tree) = &self.tree {
            self.allocs.insert(object, tree.head());
        }
    }

    /// Nœud associé à `object` au moment de son allocation.
    pub fn node_for_alloc(&self, object: ObjectId) -> Option<NodeId> {
        self.allocs.get(&object).copied()
    }

    /// Pile lisible de `object`, frame la plus interne d'abord, terminée par
    /// `"(root) :0:0"`.
    pub fn stack_for_alloc(&self, object: ObjectId) -> Option<String> {
        let tree = self.tree.as_ref()?;
        let node = self.node_for_alloc(object)?;
        Some(tree.render_stack(node))
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
