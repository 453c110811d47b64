//! `taxonopy schema` command - create and edit the schema tree

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{load_schema, parse_attributes, CommandContext};
use crate::cli::GlobalOpts;
use crate::schema::{render_schema, SchemaTree};

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Print the schema tree
    Show(ShowArgs),

    /// Start a new schema with a single root field
    New(NewArgs),

    /// Add (or replace) a field in the schema
    Add(AddArgs),

    /// Delete a field and everything below it
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Print the Tree-JSON document instead of the tree
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Name of the root field
    pub name: String,

    /// Field attributes as KEY=VALUE pairs (values are always text)
    #[arg(long, num_args = 1.., value_name = "KEY=VALUE")]
    pub attributes: Vec<String>,

    /// Overwrite an existing schema without asking
    #[arg(long)]
    pub force: bool,

    /// Show the new schema without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Name of the field to add
    pub name: String,

    /// Path of the parent field
    pub parent: String,

    /// Field attributes as KEY=VALUE pairs (values are always text)
    #[arg(long, num_args = 1.., value_name = "KEY=VALUE")]
    pub attributes: Vec<String>,

    /// Output path for the schema (default: overwrite)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Show the new schema without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Path of the field to delete
    pub path: String,

    /// Output path for the schema (default: overwrite)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Show the new schema without saving
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::new(global);
    match cmd {
        SchemaCommands::Show(args) => run_show(&ctx, args),
        SchemaCommands::New(args) => run_new(&ctx, args),
        SchemaCommands::Add(args) => run_add(&ctx, args),
        SchemaCommands::Delete(args) => run_delete(&ctx, args),
    }
}

fn run_show(ctx: &CommandContext, args: ShowArgs) -> Result<()> {
    let schema = ctx.load_schema()?;
    if args.json {
        println!("{}", schema.to_json()?);
    } else {
        print!("{}", render_schema(&schema));
    }
    Ok(())
}

fn run_new(ctx: &CommandContext, args: NewArgs) -> Result<()> {
    if ctx.schema_path.exists() && !args.force && !args.dry_run {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "A schema already exists at {}. Overwrite?",
                ctx.schema_path.display()
            ))
            .default(false)
            .interact_opt()
            .into_diagnostic()?
            .unwrap_or(false);
        if !overwrite {
            return Ok(());
        }
    }

    let schema = new_schema(&args.name, &parse_attributes(&args.attributes)?)?;
    save(ctx, &schema, &ctx.schema_path, args.dry_run)
}

/// Single-node schema; the root is a required `str` unless told otherwise
fn new_schema(name: &str, attributes: &[(String, String)]) -> Result<SchemaTree> {
    let mut attrs = attributes.to_vec();
    for (key, default) in [("type", "str"), ("required", "True")] {
        if !attrs.iter().any(|(k, _)| k == key) {
            attrs.push((key.to_string(), default.to_string()));
        }
    }

    let mut schema = SchemaTree::new();
    schema.add_node(name, None, attrs)?;
    Ok(schema)
}

fn run_add(ctx: &CommandContext, args: AddArgs) -> Result<()> {
    let mut schema = load_schema(&ctx.schema_path)?;
    add_field(
        &mut schema,
        &args.name,
        &args.parent,
        parse_attributes(&args.attributes)?,
    )?;
    let out = args.out.unwrap_or_else(|| ctx.schema_path.clone());
    save(ctx, &schema, &out, args.dry_run)
}

/// Add a field, replacing any field already at `parent/name`
fn add_field(
    schema: &mut SchemaTree,
    name: &str,
    parent: &str,
    attributes: Vec<(String, String)>,
) -> Result<()> {
    let path = format!("{}/{}", parent.trim_end_matches('/'), name);
    if schema.contains(&path) {
        tracing::info!(path = %path, "replacing existing field");
        schema.delete_node(&path)?;
    }
    schema.add_node(name, Some(parent), attributes)?;
    Ok(())
}

fn run_delete(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
    let mut schema = load_schema(&ctx.schema_path)?;
    let target = schema.find_by_path(&args.path)?;
    if schema.root_id() == Some(target) {
        return Err(miette::miette!(
            help = "start over with 'taxonopy schema new' instead",
            "Refusing to delete the schema root"
        ));
    }
    schema.delete_node(&args.path)?;
    let out = args.out.unwrap_or_else(|| ctx.schema_path.clone());
    save(ctx, &schema, &out, args.dry_run)
}

fn save(ctx: &CommandContext, schema: &SchemaTree, out: &Path, dry_run: bool) -> Result<()> {
    print!("{}", render_schema(schema));
    if dry_run {
        return Ok(());
    }

    schema.write_json(out)?;
    if !ctx.quiet {
        eprintln!(
            "{} Schema written to {}",
            style("✓").green(),
            style(out.display()).cyan()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_schema_defaults() {
        let schema = new_schema("Title", &[]).unwrap();
        let root = schema.root().unwrap();
        assert_eq!(root.attr("type"), Some("str"));
        assert_eq!(root.attr("required"), Some("True"));

        let schema = new_schema("Id", &attrs(&[("type", "int")])).unwrap();
        assert_eq!(schema.root().unwrap().attr("type"), Some("int"));
    }

    #[test]
    fn test_add_field_replaces_existing() {
        let mut schema = new_schema("Title", &[]).unwrap();
        add_field(&mut schema, "Category", "Title", attrs(&[("inquire", "list")])).unwrap();
        add_field(&mut schema, "Book", "Title/Category", vec![]).unwrap();
        add_field(&mut schema, "Category", "Title", attrs(&[("inquire", "checkbox")])).unwrap();

        let category = schema.node(schema.find_by_path("Title/Category").unwrap());
        assert_eq!(category.attr("inquire"), Some("checkbox"));
        assert!(!category.has_children());
        assert_eq!(schema.root().unwrap().child_names(), vec!["Category"]);
    }

    #[test]
    fn test_add_field_missing_parent() {
        let mut schema = new_schema("Title", &[]).unwrap();
        assert!(add_field(&mut schema, "Year", "Title/Missing", vec![]).is_err());
    }
}
