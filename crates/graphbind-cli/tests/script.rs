//! End-to-end scripts through the interpreter.

use graphbind_cli::{InterpError, Interpreter, Reply};

/// Runs `script` and returns every printed line.
fn run(interp: &mut Interpreter, script: &str) -> Vec<String> {
    let mut out = Vec::new();
    interp
        .eval_script(script, |reply| out.push(reply.to_string()))
        .unwrap();
    out
}

#[test]
fn deleting_node_invalidates_its_edges() {
    let mut interp = Interpreter::new();
    run(
        &mut interp,
        r#"
        g = graph G
        n1 = $g addnode n1
        n2 = $g addnode n2
        e1 = $g addedge $n1 $n2
        $n1 delete
        "#,
    );

    for var in ["n1", "e1"] {
        let token = interp.var(var).unwrap()[0].clone();
        assert!(matches!(
            interp.eval_line(&format!("{token} showname")),
            Err(InterpError::UnknownCommand(_))
        ));
    }
    assert_eq!(
        interp.eval_line("$n2 showname").unwrap(),
        Reply::Text("n2".into())
    );
    assert_eq!(interp.eval_line("$n2 listedges").unwrap(), Reply::List(vec![]));
}

#[test]
fn deleting_root_unbinds_every_command() {
    let mut interp = Interpreter::new();
    let out = run(
        &mut interp,
        r#"
        g = graph G
        a = $g addsubgraph A
        b = $g addsubgraph B color blue
        $a addedge x y
        $b addedge y z k1
        commands
        $g delete
        commands
        "#,
    );
    assert_eq!(
        out,
        vec![
            "edge0_1",
            "edge1_1",
            "graph0_1 graph1_1 graph2_1 node0_1 node1_1 edge0_1 node2_1 edge1_1",
            "",
        ]
    );
    assert_eq!(interp.session().registries().live_handles(), 0);
    assert_eq!(interp.session().graph_count(), 0);
}

#[test]
fn subgraph_delete_removes_nodes_everywhere() {
    let mut interp = Interpreter::new();
    let out = run(
        &mut interp,
        r#"
        g = graph G
        a = $g addsubgraph A
        b = $g addsubgraph B
        shared = $a addnode shared
        $b addnode shared
        kept = $b addnode kept
        $a delete
        $b listnodes
        $g listsubgraphs
        $g findnode shared
        "#,
    );
    assert_eq!(out, vec!["node0_1", "node1_1", "graph2_1"]);
}

#[test]
fn layout_writes_bb_and_honours_rotation() {
    let mut interp = Interpreter::new();
    let out = run(
        &mut interp,
        r#"
        g = graph G
        e = $g addedge a b
        $g layout
        $g queryattributevalues bb
        $g setattributes rotate 90
        $g layout dot
        a = $g findnode a
        $a position
        "#,
    );
    assert_eq!(out, vec!["0 0 54 108", "\"0 0 54 108\"", "0 0 108 54", "27,90"]);
}

#[test]
fn nop_engine_uses_given_positions() {
    let mut interp = Interpreter::with_default_engine("nop");
    let out = run(
        &mut interp,
        r#"
        g = graph U undirected
        n = $g addnode n pos "100,200!"
        $g layout
        $n position
        "#,
    );
    assert_eq!(out, vec!["73 182 127 218", "100,200"]);
}

#[test]
fn unknown_engine_falls_back_to_dot() {
    let mut interp = Interpreter::with_default_engine("bogus");
    run(&mut interp, "g = graph G\na = $g addnode a");
    assert_eq!(
        interp.eval_line("$g layout").unwrap(),
        Reply::Text("0 0 54 36".into())
    );
}

#[test]
fn edge_key_is_read_only() {
    let mut interp = Interpreter::new();
    let out = run(
        &mut interp,
        r#"
        g = graph G
        e = $g addedge a b k1
        $e setattributes key X color red
        $e queryattributes key color
        $e listnodes
        $e showname
        $g listedgeattributes
        "#,
    );
    assert_eq!(
        out,
        vec!["key k1 color red", "node0_1 node1_1", "a->b", "key color"]
    );
}

#[test]
fn defaults_apply_to_every_node() {
    let mut interp = Interpreter::new();
    let out = run(
        &mut interp,
        r#"
        g = graph G
        $g setnodeattributes shape box
        a = $g addnode a
        $a queryattributevalues shape
        $a setattributes shape circle
        $a queryattributevalues shape
        b = $g addnode b
        $b queryattributevalues shape
        $g listnodeattributes
        "#,
    );
    assert_eq!(out, vec!["box", "circle", "box", "shape"]);
}

#[test]
fn json_replies() {
    let list = Reply::List(vec!["node0_1".into(), "node1_1".into()]);
    let pairs = Reply::Pairs(vec![("color".into(), "red".into())]);
    insta::assert_snapshot!(serde_json::to_string(&list).unwrap(), @r#"["node0_1","node1_1"]"#);
    insta::assert_snapshot!(serde_json::to_string(&pairs).unwrap(), @r#"[["color","red"]]"#);
    assert_eq!(serde_json::to_string(&Reply::Empty).unwrap(), "null");
}

#[test]
fn errors_report_line() {
    let mut interp = Interpreter::new();
    let err = interp
        .eval_script("g = graph G\n$g layout \"unterminated", |_| {})
        .unwrap_err();
    assert_eq!(err.to_string(), "line 2: syntax error: missing close-quote");
}
