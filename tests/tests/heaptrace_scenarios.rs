//! Scénarios bout-en-bout du suivi des sites d'allocation, pilotés par le
//! flux d'événements que l'interpréteur émettrait pour chaque programme.

use lueur_heaptrace::CallFrameInfo;
use lueur_tests::SimRuntime;
use pretty_assertions::assert_eq;

/// `function bar(){return new Object();} function foo(){return bar();} foo();`
///
/// Deux frames `global` : le corps du script et son enveloppe module. Cette
/// forme imbriquée est un invariant du compilateur, pas un accident — les
/// consommateurs la vérifient telle quelle.
#[test]
fn basic_operation() {
    let mut rt = SimRuntime::with_tracking();
    rt.call("global", "test.lueur", 1, 1);
    rt.call("global", "test.lueur", 1, 75);
    rt.call("foo", "test.lueur", 1, 66);
    rt.call("bar", "test.lueur", 1, 34);
    let obj = rt.alloc();
    rt.ret();
    rt.ret();
    rt.ret();
    rt.ret();

    assert_eq!(
        rt.trace(obj),
        "bar test.lueur:1:34\n\
         foo test.lueur:1:66\n\
         global test.lueur:1:75\n\
         global test.lueur:1:1\n\
         (root) :0:0"
    );
    assert!(rt.stack_is_empty());
}

/// La frame active est re-poussée quand l'exécution avance (entrée de
/// fonction puis site d'allocation) : les deux nœuds frères subsistent dans
/// l'arbre, on ne les fusionne pas.
#[test]
fn entry_and_alloc_sites_stay_siblings() {
    let mut rt = SimRuntime::with_tracking();
    rt.call("global", "test.lueur", 1, 1);
    rt.call("foo", "test.lueur", 1, 66);

    // entrée de bar…
    rt.call("bar", "test.lueur", 1, 1);
    // …puis l'exécution atteint le site d'allocation : re-keying pop + push
    rt.ret();
    rt.call("bar", "test.lueur", 1, 34);
    let obj = rt.alloc();
    rt.ret();
    rt.ret();
    rt.ret();

    let tree = rt.tracker.tree().unwrap();
    let json = tree.to_json();
    let foo = &json["children"][0]["children"][0];
    assert_eq!(foo["name"], "foo");
    let bars: Vec<&str> = foo["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(bars, vec!["bar", "bar"]);

    assert!(rt.trace(obj).starts_with("bar test.lueur:1:34"));
    assert!(rt.stack_is_empty());
}

/// K invocations d'un callback via une primitive d'itération native : une
/// seule chaîne partagée à travers la frame trampoline, pas K.
#[test]
fn native_trampoline_is_shared_across_invocations() {
    const K: u64 = 10;

    let mut rt = SimRuntime::with_tracking();
    rt.call("global", "map.lueur", 1, 1);
    rt.call("global", "map.lueur", 6, 9);
    rt.call("(native)", "", 0, 0);

    let mut objects = Vec::new();
    for _ in 0..K {
        rt.call("each", "map.lueur", 4, 20);
        objects.push(rt.alloc());
        rt.ret();
    }
    rt.ret();
    rt.ret();
    rt.ret();

    // racine + 2×global + trampoline + callback
    assert_eq!(rt.tracker.tree().unwrap().node_count(), 5);
    let first = rt.tracker.node_for_alloc(objects[0]).unwrap();
    for obj in &objects {
        assert_eq!(rt.tracker.node_for_alloc(*obj), Some(first));
    }
    assert_eq!(
        rt.trace(objects[0]),
        "each map.lueur:4:20\n\
         (native) :0:0\n\
         global map.lueur:6:9\n\
         global map.lueur:1:1\n\
         (root) :0:0"
    );
    assert!(rt.stack_is_empty());
}

/// Une exception qui traverse plusieurs frames produit exactement un pop par
/// appel quitté ; après rattrapage puis fin du programme, head est revenu à
/// la racine.
#[test]
fn unwind_on_throw() {
    let mut rt = SimRuntime::with_tracking();
    rt.call("global", "test.lueur", 2, 1);
    rt.call("global", "test.lueur", 15, 9);
    rt.call("try_alloc", "test.lueur", 10, 13);
    rt.call("layer_two", "test.lueur", 7, 38);
    rt.call("layer_one", "test.lueur", 6, 37);
    rt.call("thrower", "test.lueur", 4, 18);
    let err = rt.alloc();

    // throw : trois frames quittées avant le catch dans try_alloc
    rt.unwind(3);
    rt.ret(); // try_alloc retourne l'erreur
    rt.ret();
    rt.ret();

    assert_eq!(
        rt.trace(err),
        "thrower test.lueur:4:18\n\
         layer_one test.lueur:6:37\n\
         layer_two test.lueur:7:38\n\
         try_alloc test.lueur:10:13\n\
         global test.lueur:15:9\n\
         global test.lueur:2:1\n\
         (root) :0:0"
    );
    assert!(rt.stack_is_empty());
}

/// Activation du suivi au milieu d'un appel : la chaîne d'ancêtres est
/// resynthétisée, et la sortie de la frame native qui a déclenché
/// l'activation est absorbée par un unique pop sans effet.
#[test]
fn enable_mid_stack_then_balanced_unwind() {
    let mut rt = SimRuntime::with_tracking_mid_stack(&[
        CallFrameInfo { name: "global", script_name: "test.lueur", line: 2, column: 1 },
        CallFrameInfo { name: "global", script_name: "test.lueur", line: 3, column: 11 },
    ]);
    let obj = rt.alloc();

    assert_eq!(
        rt.trace(obj),
        "global test.lueur:3:11\n\
         global test.lueur:2:1\n\
         (root) :0:0"
    );

    // sortie de l'appel natif qui a activé le suivi : pop absorbé
    rt.ret();
    // puis les deux frames réelles
    rt.ret();
    rt.ret();
    assert!(rt.stack_is_empty());
}

/// Ancêtres indescriptibles : un unique placeholder plat.
#[test]
fn enable_mid_stack_with_unknown_ancestor() {
    let mut rt = SimRuntime::with_tracking_mid_stack(&[CallFrameInfo::unknown()]);
    rt.call("leaf", "test.lueur", 9, 3);
    let obj = rt.alloc();

    assert_eq!(
        rt.trace(obj),
        "leaf test.lueur:9:3\n\
         (unknown) :0:0\n\
         (root) :0:0"
    );
}

/// Le cycle activer → désactiver → réactiver repart d'un arbre vierge.
#[test]
fn disable_then_reenable_resets() {
    let mut rt = SimRuntime::with_tracking();
    rt.call("global", "test.lueur", 1, 1);
    let obj = rt.alloc();
    rt.ret();

    rt.tracker.disable();
    assert!(rt.tracker.node_for_alloc(obj).is_none());

    rt.tracker.enable();
    assert_eq!(rt.tracker.tree().unwrap().node_count(), 1);
}
