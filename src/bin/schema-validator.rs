//! A command-line utility for validating SCIM schema files, as defined in RFC 7643.
//!
//! Carried over from the upstream library this crate was built from: the
//! validation rules (required fields, URI-shaped `id`, canonical-values only
//! on string attributes, complex attributes requiring sub-attributes) are
//! unchanged. The schema-registry-loading step from the original tool is
//! dropped here since this crate serves the two core schemas from
//! `schema::embedded` rather than from a directory of user-supplied files;
//! what remains is the per-file/per-directory validation the tool is for.
//!
//! Usage:
//!   cargo run --bin schema-validator schemas/User.json
//!   cargo run --bin schema-validator ./schemas/

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::process;

use scim_sandbox::schema::{AttributeDefinition, AttributeType, Schema};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <schema-file-or-directory>", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} schemas/User.json", args[0]);
        eprintln!("  {} ./schemas/", args[0]);
        process::exit(1);
    }

    let path = Path::new(&args[1]);

    if path.is_file() {
        validate_single_file(path);
    } else if path.is_dir() {
        validate_directory(path);
    } else {
        eprintln!("Error: '{}' is not a valid file or directory", path.display());
        process::exit(1);
    }
}

fn validate_single_file(file_path: &Path) {
    println!("Validating schema file: {}", file_path.display());

    match load_and_validate_schema(file_path) {
        Ok(schema) => {
            println!("Schema is valid!");
            print_schema_summary(&schema);
        }
        Err(e) => {
            eprintln!("Schema validation failed: {e}");
            process::exit(1);
        }
    }
}

fn validate_directory(dir_path: &Path) {
    println!("Validating schemas in directory: {}", dir_path.display());

    let mut valid_count = 0;
    let mut error_count = 0;

    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory: {e}");
            process::exit(1);
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        println!("\nValidating: {}", path.file_name().unwrap().to_string_lossy());
        match load_and_validate_schema(&path) {
            Ok(schema) => {
                println!("  Valid - {} ({})", schema.name, schema.id);
                valid_count += 1;
            }
            Err(e) => {
                eprintln!("  Invalid - {e}");
                error_count += 1;
            }
        }
    }

    println!("\nValidation Summary:");
    println!("  Valid schemas: {valid_count}");
    println!("  Invalid schemas: {error_count}");

    if error_count > 0 {
        process::exit(1);
    }
}

fn load_and_validate_schema(file_path: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    let json_value: serde_json::Value = serde_json::from_str(&content)?;

    let obj = json_value.as_object().ok_or("schema must be a JSON object")?;
    for required in ["id", "name", "attributes"] {
        if !obj.contains_key(required) {
            return Err(format!("schema missing required '{required}' field").into());
        }
    }

    let schema: Schema = serde_json::from_str(&content)?;
    validate_schema_structure(&schema)?;
    Ok(schema)
}

fn validate_schema_structure(schema: &Schema) -> Result<(), Box<dyn std::error::Error>> {
    if schema.id.is_empty() {
        return Err("schema id cannot be empty".into());
    }
    if !schema.id.starts_with("urn:") && !schema.id.starts_with("http") {
        return Err("schema id should be a URI (starting with 'urn:' or 'http')".into());
    }
    if schema.name.is_empty() {
        return Err("schema name cannot be empty".into());
    }
    if schema.attributes.is_empty() {
        return Err("schema must have at least one attribute".into());
    }

    for (i, attr) in schema.attributes.iter().enumerate() {
        validate_attribute(attr, &format!("attribute[{i}]"))?;
    }
    Ok(())
}

fn validate_attribute(attr: &AttributeDefinition, context: &str) -> Result<(), Box<dyn std::error::Error>> {
    if attr.name.is_empty() {
        return Err(format!("{context}: attribute name cannot be empty").into());
    }

    if !attr.canonical_values.is_empty() && !matches!(attr.data_type, AttributeType::String) {
        return Err(format!("{context}: canonical values only allowed for string attributes").into());
    }

    if matches!(attr.data_type, AttributeType::Complex) {
        if attr.sub_attributes.is_empty() {
            return Err(format!("{context}: complex attributes must have sub-attributes").into());
        }
        for (i, sub_attr) in attr.sub_attributes.iter().enumerate() {
            validate_attribute(sub_attr, &format!("{context}.subAttributes[{i}]"))?;
        }
    } else if !attr.sub_attributes.is_empty() {
        return Err(format!("{context}: non-complex attributes cannot have sub-attributes").into());
    }

    Ok(())
}

fn print_schema_summary(schema: &Schema) {
    println!();
    println!("Schema Summary:");
    println!("  ID: {}", schema.id);
    println!("  Name: {}", schema.name);
    println!("  Description: {}", schema.description);
    println!("  Attributes: {}", schema.attributes.len());

    let mut type_counts: HashMap<String, usize> = HashMap::new();
    let mut required_count = 0;
    let mut multi_valued_count = 0;

    for attr in &schema.attributes {
        *type_counts.entry(format!("{:?}", attr.data_type)).or_insert(0) += 1;
        if attr.required {
            required_count += 1;
        }
        if attr.multi_valued {
            multi_valued_count += 1;
        }
    }

    println!("  Required attributes: {required_count}");
    println!("  Multi-valued attributes: {multi_valued_count}");
    println!("  Attribute types:");
    for (attr_type, count) in type_counts {
        println!("    - {attr_type}: {count}");
    }

    let required_attrs: Vec<&str> = schema
        .attributes
        .iter()
        .filter(|a| a.required)
        .map(|a| a.name.as_str())
        .collect();
    if !required_attrs.is_empty() {
        println!("  Required attribute names: {}", required_attrs.join(", "));
    }
}
