//! lueur-tests — fixtures d'intégration du sous-système de debug
//!
//! `SimRuntime` rejoue le flux d'événements que l'interpréteur émet vers le
//! tracker d'allocations : entrée d'appel `(nom, script, ligne, colonne)`,
//! sortie d'appel (sans payload), allocation. Les scénarios des tests
//! d'intégration pilotent cette façade exactement comme la VM le ferait.

use lueur_heaptrace::{AllocationLocationTracker, CallFrameInfo, ObjectId};

/// Mini-runtime : un tracker d'allocations et un compteur d'objets.
#[derive(Debug, Default)]
pub struct SimRuntime {
    /// Le tracker sous test.
    pub tracker: AllocationLocationTracker,
    next_object: u64,
}

impl SimRuntime {
    /// Runtime avec suivi actif depuis le démarrage (pile vide).
    pub fn with_tracking() -> Self {
        let mut rt = Self::default();
        rt.tracker.enable();
        rt
    }

    /// Runtime dont le suivi s'active alors que `frames` sont déjà actives
    /// (le plus externe d'abord).
    pub fn with_tracking_mid_stack(frames: &[CallFrameInfo<'_>]) -> Self {
        let mut rt = Self::default();
        rt.tracker.enable_mid_stack(frames);
        rt
    }

    /// Événement d'entrée d'appel.
    pub fn call(&mut self, name: &str, script: &str, line: u32, column: u32) {
        let tree = self.tracker.tree_mut().expect("tracking must be enabled");
        tree.push_call(&CallFrameInfo { name, script_name: script, line, column });
    }

    /// Événement de sortie d'appel (retour normal ou fin d'appel natif).
    pub fn ret(&mut self) {
        self.tracker.tree_mut().expect("tracking must be enabled").pop_call();
    }

    /// Dépilement d'exception à travers `frames` appels : rien d'autre que
    /// `frames` sorties ordinaires.
    pub fn unwind(&mut self, frames: u32) {
        for _ in 0..frames {
            self.ret();
        }
    }

    /// Allocation d'un objet du tas ; retourne son identifiant.
    pub fn alloc(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.tracker.record_alloc(id);
        id
    }

    /// Pile lisible de `object`, sans retour à la ligne final.
    pub fn trace(&self, object: ObjectId) -> String {
        self.tracker
            .stack_for_alloc(object)
            .expect("object must have been allocated under tracking")
            .trim_end()
            .to_owned()
    }

    /// Vrai quand la pile simulée est entièrement dépilée.
    pub fn stack_is_empty(&self) -> bool {
        self.tracker.tree().is_some_and(lueur_heaptrace::StackTracesTree::is_head_at_root)
    }
}
