//! lueur-heaptrace — Attribution des allocations du tas aux piles d'appels
//!
//! Deux pièces :
//! - `StackTracesTree` : arbre enraciné des identités de frames
//!   `(nom, localisation source)`. L'interpréteur pousse un nœud à chaque
//!   entrée de fonction et dépile à chaque sortie (retour, exception ou fin
//!   d'appel natif). Les sites d'appel identiques fusionnent : une boucle qui
//!   appelle N fois la même fonction depuis le même site ne crée qu'un nœud.
//! - `AllocationLocationTracker` : à chaque allocation, photographie le nœud
//!   de tête courant et l'associe à l'objet ; rend ensuite les piles
//!   lisibles, frame la plus interne d'abord.
//!
//! Modèle mono-thread coopératif : tout se passe sur le thread logique
//! d'exécution de la VM, aucune synchronisation. Les violations d'appariement
//! push/pop sont des assertions, pas des erreurs récupérables.

#![forbid(unsafe_code)]

mod tracker;
mod tree;

pub use tracker::{AllocationLocationTracker, ObjectId};
pub use tree::{CallFrameInfo, NodeId, SourceLoc, StackTracesTree, StackTracesTreeNode};
