//! tree.rs — Arbre des piles d'appels dédupliquées
//!
//! Rôle :
//! - Un nœud par identité de frame `(nom, localisation source)` ; les appels
//!   répétés depuis le même site traversent le même nœud au lieu d'en créer
//! - `head` = frame active ; `push_call` descend (réutilise ou crée),
//!   `pop_call` remonte au parent
//! - Le dépilement d'exception n'a pas de transition spéciale : exactement
//!   un pop par appel quitté, quel que soit le mode de sortie
//!
//! Propriété : l'arène (`Vec`) possède tous les nœuds ; les enfants sont les
//! seules arêtes de propriété, le parent est un index non-propriétaire. Tout
//! est libéré d'un bloc quand l'arbre est jeté.

use indexmap::IndexMap;

use lueur_core::{StringId, UniquingStringTable};

/* ─────────────────────────── Types de base ─────────────────────────── */

/// Localisation source d'une frame (chaînes internées dans l'arbre).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    /// Nom du script, interné.
    pub script_name: StringId,
    /// Ligne, base 1 (0 pour la racine synthétique).
    pub line_no: u32,
    /// Colonne, base 1 (0 pour la racine synthétique).
    pub column_no: u32,
}

/// Index d'un nœud dans l'arène de l'arbre. Stable tant que l'arbre vit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Description d'une frame telle qu'émise par l'interpréteur à l'entrée
/// d'une fonction.
#[derive(Debug, Clone, Copy)]
pub struct CallFrameInfo<'a> {
    /// Nom de la fonction appelée.
    pub name: &'a str,
    /// Script d'où provient la frame.
    pub script_name: &'a str,
    /// Ligne courante dans l'appelant.
    pub line: u32,
    /// Colonne courante dans l'appelant.
    pub column: u32,
}

impl CallFrameInfo<'static> {
    /// Frame de remplacement pour un ancêtre que l'interpréteur ne sait pas
    /// décrire (activation du suivi au milieu d'un appel natif).
    pub const fn unknown() -> Self {
        Self { name: "(unknown)", script_name: "", line: 0, column: 0 }
    }
}

/// Identité de dédup d'un enfant : même clé → même nœud.
type NodeKey = (StringId, SourceLoc);

/* ─────────────────────────── Nœud ─────────────────────────── */

/// Nœud de l'arbre : une identité de frame et ses enfants.
#[derive(Debug)]
pub struct StackTracesTreeNode {
    name: StringId,
    source_loc: SourceLoc,
    parent: Option<NodeId>,
    children: IndexMap<NodeKey, NodeId>,
}

impl StackTracesTreeNode {
    /// Nom de la frame, interné.
    pub fn name(&self) -> StringId { self.name }

    /// Localisation de la frame.
    pub fn source_loc(&self) -> SourceLoc { self.source_loc }

    /// Parent (non-propriétaire), `None` pour la racine.
    pub fn parent(&self) -> Option<NodeId> { self.parent }

    /// Enfants dans l'ordre d'insertion.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// Nombre d'enfants distincts.
    pub fn child_count(&self) -> usize { self.children.len() }
}

/* ─────────────────────────── Arbre ─────────────────────────── */

/// Arbre enraciné des piles d'appels. Créé à l'activation du suivi
/// d'allocations, détruit d'un bloc à la désactivation.
#[derive(Debug)]
pub struct StackTracesTree {
    /// Arène : propriétaire de tous les nœuds, `NodeId` = index.
    nodes: Vec<StackTracesTreeNode>,
    /// Chaînes internées (noms de fonctions et de scripts).
    strings: UniquingStringTable,
    /// Frame active courante.
    head: NodeId,
    /// Pops à absorber sans bouger : la frame qui a activé le suivi en cours
    /// d'exécution sera quittée sans avoir poussé de nœud correspondant.
    deferred_pops: u32,
}

impl Default for StackTracesTree {
    fn default() -> Self { Self::new() }
}

impl StackTracesTree {
    /// Crée l'arbre : racine synthétique `"(root)"`, localisation vide,
    /// head sur la racine.
    pub fn new() -> Self {
        let mut strings = UniquingStringTable::new();
        let root_name = strings.intern("(root)");
        let empty = strings.intern("");
        let root = StackTracesTreeNode {
            name: root_name,
            source_loc: SourceLoc { script_name: empty, line_no: 0, column_no: 0 },
            parent: None,
            children: IndexMap::new(),
        };
        Self { nodes: vec![root], strings, head: NodeId(0), deferred_pops: 0 }
    }

    /// Racine de l'arbre.
    pub fn root(&self) -> NodeId { NodeId(0) }

    /// Frame active courante.
    pub fn head(&self) -> NodeId { self.head }

    /// Vrai quand aucune frame n'est active (pile interpréteur vide).
    pub fn is_head_at_root(&self) -> bool { self.head == self.root() }

    /// Nombre total de nœuds (racine comprise).
    pub fn node_count(&self) -> usize { self.nodes.len() }

    /// Accès à un nœud. Les `NodeId` viennent de cet arbre ; hors bornes =
    /// bug interne.
    pub fn node(&self, id: NodeId) -> &StackTracesTreeNode {
        &self.nodes[id.0 as usize]
    }

    /// Résout une chaîne internée de l'arbre.
    pub fn string(&self, id: StringId) -> &str { self.strings.resolve(id) }

    /// Entrée de fonction : réutilise l'enfant `(nom, loc)` du head s'il
    /// existe, sinon le crée, puis avance head dessus.
    pub fn push_call(&mut self, frame: &CallFrameInfo<'_>) -> NodeId {
        let name = self.strings.intern(frame.name);
        let script_name = self.strings.intern(frame.script_name);
        let loc = SourceLoc { script_name, line_no: frame.line, column_no: frame.column };
        let key: NodeKey = (name, loc);

        if let Some(&existing) = self.nodes[self.head.0 as usize].children.get(&key) {
            self.head = existing;
            return existing;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(StackTracesTreeNode {
            name,
            source_loc: loc,
            parent: Some(self.head),
            children: IndexMap::new(),
        });
        self.nodes[self.head.0 as usize].children.insert(key, id);
        #[cfg(feature = "trace")]
        log::trace!("new stack trace node {} for {}", id.0, frame.name);
        self.head = id;
        id
    }

    /// Sortie de fonction (retour, exception ou fin d'appel natif) : head
    /// remonte au parent. Dépiler la racine est un bug d'appariement
    /// push/pop côté interpréteur.
    pub fn pop_call(&mut self) {
        if self.deferred_pops > 0 {
            self.deferred_pops -= 1;
            #[cfg(feature = "trace")]
            log::trace!("absorbed deferred pop ({} left)", self.deferred_pops);
            return;
        }
        let parent = self.nodes[self.head.0 as usize].parent;
        self.head = parent.expect("popped past root of stack traces tree");
    }

    /// Reconstruit la chaîne d'ancêtres des frames déjà actives quand le
    /// suivi s'active en cours d'exécution (les frames indescriptibles
    /// passent [`CallFrameInfo::unknown`]).
    ///
    /// La frame native qui a déclenché l'activation sera quittée sans avoir
    /// poussé de nœud : son pop, excédentaire, est absorbé tel quel. Les
    /// consommateurs dépendent de cet équilibre, ne pas le « corriger ».
    pub fn sync_with_runtime_stack(&mut self, frames: &[CallFrameInfo<'_>]) {
        assert!(self.is_head_at_root(), "stack sync requires head at root");
        for frame in frames {
            self.push_call(frame);
        }
        self.deferred_pops += 1;
        #[cfg(feature = "trace")]
        log::debug!("synced {} active frames onto stack traces tree", frames.len());
    }

    /// Rend la pile de `node` vers la racine, frame la plus interne
    /// d'abord, une ligne `"<nom> <script>:<ligne>:<colonne>"` par frame.
    pub fn render_stack(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id);
            out.push_str(self.string(n.name));
            out.push(' ');
            out.push_str(self.string(n.source_loc.script_name));
            out.push_str(&format!(":{}:{}\n", n.source_loc.line_no, n.source_loc.column_no));
            current = n.parent;
        }
        out
    }

    /// Dump JSON de l'arbre entier (outillage profiler) : enfants dans
    /// l'ordre d'insertion, clés `name`/`scriptName`/`line`/`col`/`children`.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> serde_json::Value {
        self.node_to_json(self.root())
    }

    #[cfg(feature = "json")]
    fn node_to_json(&self, id: NodeId) -> serde_json::Value {
        let node = self.node(id);
        let children: Vec<serde_json::Value> =
            node.children().map(|child| self.node_to_json(child)).collect();
        serde_json::json!({
            "name": self.string(node.name),
            "scriptName": self.string(node.source_loc.script_name),
            "line": node.source_loc.line_no,
            "col": node.source_loc.column_no,
            "children": children,
        })
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
