//! `taxonopy db` command - build, query and exchange records

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::builder::{
    BuildError, FlatRecordBuilder, PromptError, Prompter, RecordBuilder, TermPrompter,
};
use crate::cli::helpers::{open_store_at, record_label, CommandContext};
use crate::cli::GlobalOpts;
use crate::schema::{render_record, NodeAttributes, SchemaTree};
use crate::store::{csv as sheet, Query, RecordStore};

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Build a new record interactively and store it
    New,

    /// Re-edit stored records
    Update(UpdateArgs),

    /// Count records holding a field
    Count(MatchArgs),

    /// Print full records holding a field
    Show(MatchArgs),

    /// List the value of a field across records
    List(ListArgs),

    /// Count records per option of a choice field
    Choices(ChoicesArgs),

    /// Write all records to a CSV file
    Dump(DumpArgs),

    /// Replace (or extend) the store with records from a CSV file
    Load(LoadArgs),

    /// Compare records with another store
    Diff(DiffArgs),
}

#[derive(clap::Args, Debug)]
pub struct MatchArgs {
    /// Path of the field to search for
    pub path: String,

    /// Only match records whose field value contains this text
    #[arg(long)]
    pub value: Option<String>,

    /// Require the value to match exactly
    #[arg(long, requires = "value")]
    pub exact: bool,
}

impl MatchArgs {
    fn query(&self) -> Query {
        Query::from_parts(&self.path, self.value.as_deref(), self.exact)
    }
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub filter: MatchArgs,

    /// Only re-edit this field (schema path), keeping the rest of the record
    #[arg(long)]
    pub field: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Field paths to list (default: the root)
    #[arg(long = "path", short = 'p')]
    pub paths: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ChoicesArgs {
    /// Path of the choice field
    pub path: String,

    /// Also save the counts to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DumpArgs {
    /// CSV file to write
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// CSV file to read
    pub file: PathBuf,

    /// Keep existing records instead of replacing them
    #[arg(long)]
    pub append: bool,

    /// Reject cells that do not fit the schema instead of leaving them out
    #[arg(long)]
    pub strict: bool,

    /// Continue loading after bad rows (default: stop on the first one)
    #[arg(long)]
    pub skip_errors: bool,
}

#[derive(clap::Args, Debug)]
pub struct DiffArgs {
    /// Store to compare against
    pub other: PathBuf,
}

pub fn run(cmd: DbCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::new(global);
    match cmd {
        DbCommands::New => run_new(&ctx),
        DbCommands::Update(args) => run_update(&ctx, args),
        DbCommands::Count(args) => run_count(&ctx, args),
        DbCommands::Show(args) => run_show(&ctx, args),
        DbCommands::List(args) => run_list(&ctx, args),
        DbCommands::Choices(args) => run_choices(&ctx, args),
        DbCommands::Dump(args) => run_dump(&ctx, args),
        DbCommands::Load(args) => run_load(&ctx, args),
        DbCommands::Diff(args) => run_diff(&ctx, args),
    }
}

// ----------------------------------------------------------------------
// Interactive commands
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Retry,
    Quit,
}

impl Answer {
    fn as_str(&self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Retry => "retry",
            Answer::Quit => "quit",
        }
    }
}

/// Ask a question with a fixed set of answers; cancelling counts as quit
fn ask<P: Prompter>(prompter: &mut P, message: &str, options: &[Answer], default: Answer) -> Result<Answer> {
    let labels: Vec<String> = options.iter().map(|a| a.as_str().to_string()).collect();
    match prompter.ask_single_choice(message, &labels, Some(default.as_str())) {
        Ok(picked) => Ok(options
            .iter()
            .copied()
            .find(|a| a.as_str() == picked)
            .unwrap_or(Answer::Quit)),
        Err(PromptError::Cancelled) => Ok(Answer::Quit),
        Err(e) => Err(e.into()),
    }
}

/// Build, confirm and store one record
///
/// Returns the new record's id, or `None` if the user quit.
fn new_record<P: Prompter>(
    prompter: &mut P,
    schema: &SchemaTree,
    store: &mut RecordStore,
) -> Result<Option<i64>> {
    let builder = RecordBuilder::new(schema);
    let mut previous: Option<SchemaTree> = None;

    loop {
        let record = match builder.build(prompter, previous.as_ref(), None) {
            Ok(record) => record,
            Err(BuildError::Cancelled) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        print!("{}", render_record(&record));

        let label = record_label(&record);
        match ask(
            prompter,
            &format!("Store record with {}?", label),
            &[Answer::Yes, Answer::Retry, Answer::Quit],
            Answer::Yes,
        )? {
            Answer::Quit => return Ok(None),
            Answer::Retry => {
                previous = Some(record);
                continue;
            }
            _ => {}
        }

        if duplicates(store, &record)? > 0 {
            match ask(
                prompter,
                &format!("A record with {} already exists. Add another?", label),
                &[Answer::Yes, Answer::Retry, Answer::Quit],
                Answer::Retry,
            )? {
                Answer::Quit => return Ok(None),
                Answer::Retry => {
                    previous = Some(record);
                    continue;
                }
                _ => {}
            }
        }

        return store.insert(&record).map(Some);
    }
}

/// Stored records sharing this record's root value
fn duplicates(store: &RecordStore, record: &SchemaTree) -> Result<usize> {
    let Some(root) = record.root() else {
        return Ok(0);
    };
    match root.attr("value") {
        Some(value) => store.count(&Query::value_is(root.name(), value)),
        None => Ok(0),
    }
}

/// Walk the matching records, re-editing the ones the user picks
///
/// Returns the number of records replaced.
fn update_records<P: Prompter>(
    prompter: &mut P,
    schema: &SchemaTree,
    store: &mut RecordStore,
    query: &Query,
    field: Option<&str>,
) -> Result<usize> {
    let builder = RecordBuilder::new(schema);
    let mut replaced = 0;

    for stored in store.search(query)? {
        let label = record_label(&stored.record);
        match ask(
            prompter,
            &format!("Update record with {}?", label),
            &[Answer::Yes, Answer::No, Answer::Quit],
            Answer::Yes,
        )? {
            Answer::Quit => return Ok(replaced),
            Answer::No => continue,
            _ => {}
        }

        loop {
            let updated = match builder.build(prompter, Some(&stored.record), field) {
                Ok(record) => record,
                Err(BuildError::Cancelled) => return Ok(replaced),
                Err(e) => return Err(e.into()),
            };
            print!("{}", render_record(&updated));

            match ask(
                prompter,
                "Store updated record?",
                &[Answer::Yes, Answer::No, Answer::Retry, Answer::Quit],
                Answer::Yes,
            )? {
                Answer::Quit => return Ok(replaced),
                Answer::Retry => continue,
                Answer::No => break,
                Answer::Yes => {
                    store.replace(stored.id, &updated)?;
                    replaced += 1;
                    break;
                }
            }
        }
    }

    Ok(replaced)
}

fn run_new(ctx: &CommandContext) -> Result<()> {
    let schema = ctx.load_schema()?;
    let mut store = ctx.create_store()?;
    let mut prompter = TermPrompter::new();

    if let Some(id) = new_record(&mut prompter, &schema, &mut store)? {
        if !ctx.quiet {
            eprintln!("{} Stored record {}", style("✓").green(), style(id).cyan());
        }
    }
    Ok(())
}

fn run_update(ctx: &CommandContext, args: UpdateArgs) -> Result<()> {
    let schema = ctx.load_schema()?;
    if let Some(field) = &args.field {
        schema.find_by_path(field)?;
    }
    let mut store = ctx.open_store()?;
    let query = args.filter.query();

    if store.count(&query)? == 0 {
        println!("No matching records");
        return Ok(());
    }

    let mut prompter = TermPrompter::new();
    let replaced = update_records(&mut prompter, &schema, &mut store, &query, args.field.as_deref())?;
    if !ctx.quiet {
        eprintln!("{} Updated {} record(s)", style("✓").green(), style(replaced).cyan());
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Queries
// ----------------------------------------------------------------------

fn run_count(ctx: &CommandContext, args: MatchArgs) -> Result<()> {
    let store = ctx.open_store()?;
    println!("{}", store.count(&args.query())?);
    Ok(())
}

fn run_show(ctx: &CommandContext, args: MatchArgs) -> Result<()> {
    let store = ctx.open_store()?;
    for (i, stored) in store.search(&args.query())?.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", render_record(&stored.record));
    }
    Ok(())
}

/// `name: value` for the node at `path`, or just the name when it has no value
fn field_label(record: &SchemaTree, path: &str) -> Option<String> {
    let node = record.node(record.try_find(path)?);
    Some(match node.attr("value") {
        Some(value) => format!("{}: {}", node.name(), value),
        None => node.name().to_string(),
    })
}

fn run_list(ctx: &CommandContext, args: ListArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let records = store.all()?;

    if args.paths.len() <= 1 {
        for stored in &records {
            let path = match args.paths.first() {
                Some(path) => path.clone(),
                None => match stored.record.root() {
                    Some(root) => root.path(),
                    None => continue,
                },
            };
            if let Some(label) = field_label(&stored.record, &path) {
                println!("{}", label);
            }
        }
        return Ok(());
    }

    let mut builder = Builder::default();
    let mut header = vec!["ID".to_string()];
    header.extend(args.paths.iter().cloned());
    builder.push_record(header);

    for stored in &records {
        let mut row = vec![stored.id.to_string()];
        row.extend(args.paths.iter().map(|path| {
            field_label(&stored.record, path).unwrap_or_default()
        }));
        builder.push_record(row);
    }
    println!("{}", builder.build().with(Style::markdown()));
    Ok(())
}

/// Number of records holding each option of the choice field at `path`
fn choice_counts(schema: &SchemaTree, store: &RecordStore, path: &str) -> Result<Vec<(String, usize)>> {
    let node = schema.node(schema.find_by_path(path)?);
    if !NodeAttributes::of(node).is_header() {
        return Err(miette::miette!(
            help = "choice fields have an 'inquire' attribute",
            "'{}' is not a choice field",
            node.path()
        ));
    }

    let base = node.path();
    node.child_names()
        .into_iter()
        .map(|child| -> Result<(String, usize)> {
            let count = store.count(&Query::node(format!("{}/{}", base, child)))?;
            Ok((child, count))
        })
        .collect()
}

fn run_choices(ctx: &CommandContext, args: ChoicesArgs) -> Result<()> {
    let schema = ctx.load_schema()?;
    let store = ctx.open_store()?;
    let counts = choice_counts(&schema, &store, &args.path)?;

    let mut builder = Builder::default();
    builder.push_record(["Choice", "Count"]);
    for (choice, count) in &counts {
        builder.push_record([choice.clone(), count.to_string()]);
    }
    println!("{}", builder.build().with(Style::markdown()));

    if let Some(out) = &args.csv {
        let mut wtr = ::csv::Writer::from_path(out).into_diagnostic()?;
        wtr.write_record(["Field", "Count"]).into_diagnostic()?;
        for (choice, count) in &counts {
            let count = count.to_string();
            wtr.write_record([choice.as_str(), count.as_str()])
                .into_diagnostic()?;
        }
        wtr.flush().into_diagnostic()?;
        if !ctx.quiet {
            eprintln!(
                "{} Counts written to {}",
                style("✓").green(),
                style(out.display()).cyan()
            );
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Interchange
// ----------------------------------------------------------------------

fn run_dump(ctx: &CommandContext, args: DumpArgs) -> Result<()> {
    let schema = ctx.load_schema()?;
    let store = ctx.open_store()?;
    let file = File::create(&args.out).into_diagnostic()?;

    let rows = sheet::dump(
        &store,
        &schema,
        file,
        ctx.config.title_sep(),
        ctx.config.value_sep(),
    )?;

    if !ctx.quiet {
        eprintln!(
            "{} Dumped {} record(s) to {}",
            style("✓").green(),
            style(rows).cyan(),
            style(args.out.display()).yellow()
        );
    }
    Ok(())
}

fn run_load(ctx: &CommandContext, args: LoadArgs) -> Result<()> {
    if !args.file.exists() {
        return Err(miette::miette!("File not found: {}", args.file.display()));
    }
    let schema = ctx.load_schema()?;
    let mut store = ctx.create_store()?;
    let builder = FlatRecordBuilder::new(&schema)
        .title_sep(ctx.config.title_sep())
        .value_sep(ctx.config.value_sep())
        .strict(args.strict);

    let file = File::open(&args.file).into_diagnostic()?;
    let stats = sheet::load(&mut store, &builder, file, args.append, args.skip_errors)?;

    if ctx.quiet {
        return Ok(());
    }
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Load Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Rows processed:  {}", style(stats.rows_processed).cyan());
    println!("  Records stored:  {}", style(stats.records_stored).green());
    if stats.skipped > 0 {
        println!("  Skipped:         {}", style(stats.skipped).red());
        for (row, message) in &stats.errors {
            println!("    row {}: {}", row, style(message).dim());
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum RecordDiff {
    OnlyHere(String),
    OnlyThere(String),
    Changed(String, BTreeMap<String, crate::core::Change>),
}

/// Pair records by id and compare each pair
fn diff_stores(mine: &RecordStore, theirs: &RecordStore) -> Result<BTreeMap<i64, RecordDiff>> {
    let mut other: BTreeMap<i64, SchemaTree> = theirs
        .all()?
        .into_iter()
        .map(|s| (s.id, s.record))
        .collect();

    let mut diffs = BTreeMap::new();
    for stored in mine.all()? {
        match other.remove(&stored.id) {
            None => {
                diffs.insert(stored.id, RecordDiff::OnlyHere(record_label(&stored.record)));
            }
            Some(record) => {
                let changes = stored.record.diff(&record);
                if !changes.is_empty() {
                    diffs.insert(
                        stored.id,
                        RecordDiff::Changed(record_label(&stored.record), changes),
                    );
                }
            }
        }
    }
    for (id, record) in other {
        diffs.insert(id, RecordDiff::OnlyThere(record_label(&record)));
    }
    Ok(diffs)
}

fn run_diff(ctx: &CommandContext, args: DiffArgs) -> Result<()> {
    let mine = ctx.open_store()?;
    let theirs = open_store_at(&args.other)?;
    let diffs = diff_stores(&mine, &theirs)?;

    if diffs.is_empty() {
        println!("No differences");
        return Ok(());
    }

    for (id, diff) in &diffs {
        match diff {
            RecordDiff::OnlyHere(label) => {
                println!("{} record {} ({})", style("-").red(), id, label)
            }
            RecordDiff::OnlyThere(label) => {
                println!("{} record {} ({})", style("+").green(), id, label)
            }
            RecordDiff::Changed(label, changes) => {
                println!("{} record {} ({})", style("~").yellow(), id, label);
                for (path, change) in changes {
                    println!("    {:<8} {}", change.to_string(), path);
                }
            }
        }
    }
    Ok(())
}
