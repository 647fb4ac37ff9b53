use postern_config::{Endpoint, Environment, Globals, Map, Node, Reader, Scheme};
use std::time::Duration;

const CONFIG: &str = r#"
$(local_domains) = example.org example.com

hostname mx.example.org
debug off

smtp tcp://0.0.0.0:25 {
    domains $(local_domains)
    io_timeout 1m 30s
    max_message_size 32M
}

submission tls://0.0.0.0:465 {
    hostname submit.example.org
    debug
    max_message_size 1G 512M
}
"#;

#[derive(Debug, Default)]
struct Endpoints {
    hostname: String,
    debug: bool,
    domains: Vec<String>,
    io_timeout: Duration,
    max_message_size: u64,
}

fn read() -> Vec<Node> {
    Reader::with_environment(Environment::new())
        .read_str(CONFIG, "postern.conf")
        .unwrap()
}

/// Bind the top level, leaving endpoint blocks for later
fn bind_globals(tree: &[Node]) -> (Globals, Vec<Node>) {
    let root = Node::new("").with_children(tree.to_vec()).at("postern.conf", 1);

    let mut map = Map::new();
    map.allow_unknown();
    map.string("hostname", false, false, None, None);
    map.bool("debug", false, false, None);
    let blocks = map.process(&Globals::new(), &root).unwrap();

    (map.globals(), blocks)
}

fn bind_endpoint(globals: &Globals, block: &Node) -> postern_config::Result<Endpoints> {
    let mut cfg = Endpoints::default();
    {
        let mut map = Map::new();
        map.string("hostname", true, true, None, &mut cfg.hostname);
        map.bool("debug", true, false, &mut cfg.debug);
        map.string_list("domains", false, false, Some(vec!["localhost".to_string()]), &mut cfg.domains);
        map.duration("io_timeout", false, false, Some(Duration::from_secs(300)), &mut cfg.io_timeout);
        map.data_size("max_message_size", false, false, Some(32 << 20), &mut cfg.max_message_size);
        map.process(globals, block)?;
    }
    Ok(cfg)
}

#[test]
fn test_global_values_are_inherited() {
    let tree = read();
    let (globals, blocks) = bind_globals(&tree);
    assert_eq!(blocks.len(), 2);

    let smtp = bind_endpoint(&globals, &blocks[0]).unwrap();
    assert_eq!(smtp.hostname, "mx.example.org");
    assert!(!smtp.debug);
    assert_eq!(smtp.domains, ["example.org", "example.com"]);
    assert_eq!(smtp.io_timeout, Duration::from_secs(90));
    assert_eq!(smtp.max_message_size, 32 << 20);

    let submission = bind_endpoint(&globals, &blocks[1]).unwrap();
    assert_eq!(submission.hostname, "submit.example.org");
    assert!(submission.debug);
    assert_eq!(submission.domains, ["localhost"]);
    assert_eq!(submission.io_timeout, Duration::from_secs(300));
    assert_eq!(submission.max_message_size, (1024 + 512) << 20);
}

#[test]
fn test_required_directive_without_global() {
    let tree = read();
    let err = bind_endpoint(&Globals::new(), &tree[2]).unwrap_err();
    assert_eq!(err.to_string(), "postern.conf:7: missing required directive: hostname");
}

#[test]
fn test_block_arguments_are_endpoints() {
    let tree = read();
    let (_, blocks) = bind_globals(&tree);

    let endpoints: Vec<Endpoint> = blocks
        .iter()
        .map(|block| Endpoint::parse(&block.args[0]).unwrap())
        .collect();
    assert_eq!(endpoints[0].scheme(), Scheme::Tcp);
    assert_eq!(endpoints[1].scheme(), Scheme::Tls);
    assert_eq!(endpoints[1].port(), Some(465));
}
