use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use mvpa_codec::names::{ATTR_CLASS, ATTR_RECON};
use mvpa_codec::{decode_structure, verify, CodecConfig};
use mvpa_store::format::VERSION as FORMAT_VERSION;
use mvpa_store::{Node, OpenMode, StoreFile};
use mvpa_types::{ArrayData, Scalar, Value};
use serde_json::{json, Map};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CodecConfig::load(path)?,
        None => CodecConfig::default(),
    };
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::Verify(args) => cmd_verify(args, cli.format),
        Command::Dump(args) => cmd_dump(args, &config),
    }
}

fn open(path: &Path) -> anyhow::Result<StoreFile> {
    StoreFile::open(path, OpenMode::Read).with_context(|| format!("opening {}", path.display()))
}

fn select<'a>(file: &'a StoreFile, name: Option<&str>) -> anyhow::Result<&'a Node> {
    match name {
        None => Ok(file.root()),
        Some(name) => file
            .get(name)
            .with_context(|| format!("no object named {name:?} in {}", file.path().display())),
    }
}

/// Hex of the container's BLAKE3 trailer.
fn trailer_hex(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    let start = bytes.len().saturating_sub(32);
    Ok(hex::encode(&bytes[start..]))
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = open(&args.file)?;
    let node = select(&file, args.name.as_deref())?;
    let checksum = trailer_hex(&args.file)?;
    match format {
        OutputFormat::Json => {
            let out = inspect_json(&args.file, node, &checksum);
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!(
                "{} (format v{}, blake3 {})",
                args.file.display().to_string().bold(),
                FORMAT_VERSION,
                checksum[..16].dimmed()
            );
            print_node(node, node_label(node), 0);
        }
    }
    file.close()?;
    Ok(())
}

fn inspect_json(path: &Path, node: &Node, checksum: &str) -> serde_json::Value {
    json!({
        "file": path.display().to_string(),
        "version": FORMAT_VERSION,
        "checksum": checksum,
        "tree": node_json(node),
    })
}

fn node_label(node: &Node) -> &str {
    match node.path().rsplit_once('/') {
        Some((_, "")) | None => "/",
        Some((_, name)) => name,
    }
}

fn print_node(node: &Node, name: &str, indent: usize) {
    let pad = "  ".repeat(indent);
    match node {
        Node::Group(group) => {
            let attrs: Vec<String> = group
                .attrs()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("{pad}{} {}", format!("{name}/").blue().bold(), attrs.join(" ").dimmed());
            for (child_name, child) in group.children() {
                print_node(child, child_name, indent + 1);
            }
        }
        Node::Leaf(leaf) => {
            println!(
                "{pad}{} {} {:?} {} {}",
                name.green(),
                leaf.dtype().to_string().cyan(),
                leaf.shape(),
                leaf.compression().name().dimmed(),
                format!("{}/{} bytes", leaf.stored_len(), leaf.raw_len()).dimmed()
            );
        }
    }
}

fn node_json(node: &Node) -> serde_json::Value {
    match node {
        Node::Group(group) => {
            let attrs: Map<String, serde_json::Value> = group
                .attrs()
                .iter()
                .map(|(k, v)| (k.clone(), json!(v.to_string())))
                .collect();
            let children: Map<String, serde_json::Value> = group
                .children()
                .map(|(name, child)| (name.to_string(), node_json(child)))
                .collect();
            json!({ "kind": "group", "path": group.path(), "attrs": attrs, "children": children })
        }
        Node::Leaf(leaf) => json!({
            "kind": "leaf",
            "path": leaf.path(),
            "dtype": leaf.dtype().name(),
            "shape": leaf.shape(),
            "compression": leaf.compression().name(),
            "stored_bytes": leaf.stored_len(),
            "raw_bytes": leaf.raw_len(),
        }),
    }
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = open(&args.file)?;
    let issues = verify(file.root());
    file.close()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
        OutputFormat::Text if issues.is_empty() => {
            println!("{} {} is structurally sound", "✓".green().bold(), args.file.display());
        }
        OutputFormat::Text => {
            for issue in &issues {
                println!("{} {}: {}", "✗".red().bold(), issue.path.yellow(), issue.message);
            }
        }
    }
    if !issues.is_empty() {
        bail!("{} issue(s) found in {}", issues.len(), args.file.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// dump
// ---------------------------------------------------------------------------

fn cmd_dump(args: DumpArgs, config: &CodecConfig) -> anyhow::Result<()> {
    let file = open(&args.file)?;
    let node = select(&file, args.name.as_deref())?;
    let out = match node.as_group() {
        // A root of named objects dumps as one JSON object keyed by name.
        Some(root) if args.name.is_none() && !root.has_attr(ATTR_CLASS) && !root.has_attr(ATTR_RECON) => {
            let mut objects = Map::new();
            for (name, child) in root.children() {
                objects.insert(name.to_string(), value_json(&decode_structure(child, config)?));
            }
            serde_json::Value::Object(objects)
        }
        _ => value_json(&decode_structure(node, config)?),
    };
    file.close()?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn scalar_json(scalar: &Scalar) -> serde_json::Value {
    match scalar {
        Scalar::Bool(v) => json!(v),
        Scalar::I8(v) => json!(v),
        Scalar::I16(v) => json!(v),
        Scalar::I32(v) => json!(v),
        Scalar::I64(v) => json!(v),
        Scalar::U8(v) => json!(v),
        Scalar::U16(v) => json!(v),
        Scalar::U32(v) => json!(v),
        Scalar::U64(v) => json!(v),
        Scalar::F32(v) => json!(v),
        Scalar::F64(v) => json!(v),
        Scalar::Str(v) => json!(v),
    }
}

fn array_json(data: &ArrayData) -> serde_json::Value {
    (0..data.len())
        .filter_map(|i| data.get(i))
        .map(|s| scalar_json(&s))
        .collect()
}

/// JSON rendering of a decoded value. User types are shown by their
/// recorded parts, never built.
pub fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Scalar(s) => scalar_json(s),
        Value::Array(a) => json!({
            "dtype": a.dtype().name(),
            "shape": a.shape(),
            "data": array_json(a.data()),
        }),
        Value::ObjArray(a) => json!({
            "shape": a.shape(),
            "elements": a.elements().iter().map(value_json).collect::<Vec<_>>(),
        }),
        Value::List(items) | Value::Tuple(items) => items.iter().map(value_json).collect(),
        Value::Dict(fields) => fields
            .iter()
            .map(|(k, v)| (k.clone(), value_json(v)))
            .collect::<Map<_, _>>()
            .into(),
        Value::Instance(inst) => {
            let state: Map<String, serde_json::Value> =
                inst.state.iter().map(|(k, v)| (k.clone(), value_json(v))).collect();
            let mut out = json!({ "class": inst.class.to_string(), "state": state });
            if let Some(items) = &inst.items {
                let items: Map<String, serde_json::Value> =
                    items.iter().map(|(k, v)| (k.clone(), value_json(v))).collect();
                out["items"] = items.into();
            }
            out
        }
        Value::Reduced(r) => json!({
            "recon": r.factory.to_string(),
            "args": r.args.iter().map(value_json).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvpa_codec::save;
    use mvpa_types::{Fields, Instance, NdArray, TypeName};

    #[test]
    fn value_json_shapes() {
        let value = Value::List(vec![
            Value::None,
            Value::from(2i32),
            Value::Array(NdArray::new(vec![2], vec![1.5f64, 2.5]).unwrap()),
            Value::Dict(Fields::new().with("k", "v")),
            Instance::new(TypeName::new("m", "C")).with("x", 1u8).into(),
        ]);
        let out = value_json(&value);
        assert_eq!(out[0], serde_json::Value::Null);
        assert_eq!(out[1], json!(2));
        assert_eq!(out[2]["dtype"], json!("float64"));
        assert_eq!(out[2]["data"], json!([1.5, 2.5]));
        assert_eq!(out[3]["k"], json!("v"));
        assert_eq!(out[4]["class"], json!("m.C"));
        assert_eq!(out[4]["state"]["x"], json!(1));
    }

    #[test]
    fn verify_and_dump_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.mvph");
        let config = CodecConfig::default();
        save(&path, &Value::Tuple(vec![Value::from("a")]), Some("t"), OpenMode::Truncate, &config).unwrap();

        cmd_verify(VerifyArgs { file: path.clone() }, OutputFormat::Json).unwrap();
        cmd_dump(DumpArgs { file: path.clone(), name: Some("t".into()) }, &config).unwrap();
        cmd_inspect(InspectArgs { file: path.clone(), name: None }, OutputFormat::Text).unwrap();
        assert!(!StoreFile::is_open(&path));
    }

    #[test]
    fn inspect_json_reports_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.mvph");
        save(&path, &Value::from(1.5f64), Some("x"), OpenMode::Truncate, &CodecConfig::default()).unwrap();

        let file = StoreFile::open(&path, OpenMode::Read).unwrap();
        let checksum = trailer_hex(&path).unwrap();
        let out = inspect_json(&path, file.root(), &checksum);
        assert_eq!(out["version"], json!(mvpa_store::format::VERSION));
        assert_eq!(out["checksum"].as_str().map(str::len), Some(64));
        file.close().unwrap();

        cmd_inspect(InspectArgs { file: path.clone(), name: Some("x".into()) }, OutputFormat::Json)
            .unwrap();
        assert!(!StoreFile::is_open(&path));
    }

    #[test]
    fn verify_fails_on_bad_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mvph");
        let mut file = StoreFile::open(&path, OpenMode::Truncate).unwrap();
        file.root_group_mut().unwrap().create_group("orphan").unwrap();
        file.close().unwrap();
        assert!(cmd_verify(VerifyArgs { file: path }, OutputFormat::Text).is_err());
    }

    #[test]
    fn missing_name_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.mvph");
        save(&path, &Value::None, Some("a"), OpenMode::Truncate, &CodecConfig::default()).unwrap();
        let err = cmd_dump(DumpArgs { file: path, name: Some("b".into()) }, &CodecConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no object named"));
    }
}
