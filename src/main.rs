use clap::{Parser, Subcommand};
use patternkit::commands;
use patternkit::core::context::KitContext;
use patternkit::core::error::{KitError, KitResult, print_error};
use patternkit::core::logging;
use patternkit::schema::{AttributeSpec, AttributeUpdate, Cardinality, ElementSpec, ElementUpdate};
use std::path::PathBuf;

/// Author reusable code patterns, release them as toolkits, and generate code from drafts
#[derive(Parser)]
#[command(name = "patternkit")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Write a patternkit.toml in the working directory
  Init {
    /// Store directory (default: .patternkit)
    #[arg(long)]
    store_dir: Option<PathBuf>,
    /// Base directory for generated files (default: the working directory)
    #[arg(long)]
    output_root: Option<PathBuf>,
    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },

  /// Author the current pattern
  #[command(subcommand)]
  Pattern(PatternCommands),

  /// Release the current pattern as a versioned toolkit
  #[command(subcommand)]
  Toolkit(ToolkitCommands),

  /// Instantiate toolkits and generate code
  #[command(subcommand)]
  Draft(DraftCommands),
}

// ============================================================================
// Pattern authoring
// ============================================================================

#[derive(Subcommand)]
enum PatternCommands {
  /// Create a pattern and make it current
  Create {
    /// Pattern name
    name: String,
  },

  /// Make an existing pattern current
  Switch {
    name: String,
  },

  /// List stored patterns
  List {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the schema tree and pending changes
  View {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Add an attribute to an element
  AddAttribute {
    name: String,
    /// Owning element, e.g. {Api.Services} (default: the pattern root)
    #[arg(long)]
    parent: Option<String>,
    /// Data type: string, bool, int, float, datetime
    #[arg(long = "type", default_value = "string")]
    data_type: String,
    #[arg(long)]
    required: bool,
    #[arg(long)]
    default: Option<String>,
    /// Comma separated list of allowed values
    #[arg(long)]
    choices: Option<String>,
  },

  /// Change an attribute
  UpdateAttribute {
    name: String,
    #[arg(long)]
    parent: Option<String>,
    #[arg(long)]
    rename: Option<String>,
    #[arg(long = "type")]
    data_type: Option<String>,
    #[arg(long)]
    required: Option<bool>,
    #[arg(long, conflicts_with = "clear_default")]
    default: Option<String>,
    /// Remove the default value
    #[arg(long)]
    clear_default: bool,
    /// Comma separated list of allowed values; an empty string removes them
    #[arg(long)]
    choices: Option<String>,
  },

  /// Delete an attribute
  DeleteAttribute {
    name: String,
    #[arg(long)]
    parent: Option<String>,
  },

  /// Add an element or collection
  AddElement {
    name: String,
    #[arg(long)]
    parent: Option<String>,
    /// one, zero-or-one, zero-or-many, one-or-many
    #[arg(long, default_value = "one", value_parser = parse_cardinality)]
    cardinality: Cardinality,
    /// Materialise together with its parent
    #[arg(long)]
    auto_create: bool,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    description: Option<String>,
  },

  /// Change an element (renaming the root renames the pattern)
  UpdateElement {
    /// Element expression, e.g. {Api.Services}
    element: String,
    #[arg(long)]
    rename: Option<String>,
    #[arg(long, value_parser = parse_cardinality)]
    cardinality: Option<Cardinality>,
    #[arg(long)]
    auto_create: Option<bool>,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    description: Option<String>,
  },

  /// Delete an element and everything under it
  DeleteElement {
    element: String,
  },

  /// Add a code template from a file
  AddTemplate {
    name: String,
    file: PathBuf,
    #[arg(long)]
    parent: Option<String>,
  },

  /// Add a command that renders a code template to a file
  AddTemplateCommand {
    name: String,
    /// Code template name or id on the same element
    #[arg(long)]
    template: String,
    /// Output path expression, e.g. src/{{Name}}.rs
    #[arg(long)]
    path: String,
    /// Generate once; later runs only track renames
    #[arg(long)]
    one_off: bool,
    #[arg(long)]
    parent: Option<String>,
  },

  /// Change a code template command
  UpdateTemplateCommand {
    name: String,
    #[arg(long)]
    one_off: Option<bool>,
    #[arg(long)]
    path: Option<String>,
  },

  /// Add a command that runs an external application
  AddCliCommand {
    name: String,
    #[arg(long)]
    app: String,
    /// Argument expression, e.g. "fmt {{Name}}"
    #[arg(long, default_value = "")]
    args: String,
    #[arg(long)]
    parent: Option<String>,
  },

  /// Add a launch point running several commands
  AddLaunchPoint {
    name: String,
    /// Comma separated command names or ids
    #[arg(long)]
    commands: String,
    #[arg(long)]
    parent: Option<String>,
  },

  /// Add or remove commands of a launch point
  UpdateLaunchPoint {
    name: String,
    #[arg(long, default_value = "")]
    add: String,
    #[arg(long, default_value = "")]
    remove: String,
  },

  /// Delete a command, launch point, or code template
  DeleteAutomation {
    name: String,
  },
}

// ============================================================================
// Toolkits
// ============================================================================

#[derive(Subcommand)]
enum ToolkitCommands {
  /// Release the current pattern
  Build {
    /// Explicit version (default: computed from pending changes)
    #[arg(long)]
    version: Option<String>,
    /// Accept a version that does not reflect breaking changes
    #[arg(long)]
    force: bool,
    #[arg(long)]
    json: bool,
  },

  /// List toolkits and their versions
  List {
    #[arg(long)]
    json: bool,
  },
}

// ============================================================================
// Drafts
// ============================================================================

#[derive(Subcommand)]
enum DraftCommands {
  /// Create a draft from a toolkit and make it current
  New {
    toolkit: String,
    name: String,
    /// Toolkit version (default: latest)
    #[arg(long)]
    version: Option<String>,
  },

  /// Make an existing draft current
  Switch {
    name: String,
  },

  /// List drafts
  List {
    #[arg(long)]
    json: bool,
  },

  /// Show the configuration of an item
  View {
    /// Item expression, e.g. {Api.Services} (default: the draft root)
    item: Option<String>,
    /// Include the Parent chain
    #[arg(long)]
    ancestry: bool,
    #[arg(long)]
    json: bool,
  },

  /// Materialise an element, collection, or attribute
  Materialise {
    item: String,
    /// Value for an attribute
    #[arg(long)]
    value: Option<String>,
  },

  /// Append an item to a collection
  AddItem {
    collection: String,
    /// Name=Value assignments for the new item
    assignments: Vec<String>,
  },

  /// Assign attribute values
  Set {
    /// Name=Value assignments
    #[arg(required = true)]
    assignments: Vec<String>,
    /// Item expression (default: the draft root)
    #[arg(long)]
    item: Option<String>,
  },

  /// Reset every attribute of an item
  Reset {
    #[arg(long)]
    item: Option<String>,
  },

  /// Remove every item of a collection
  Clear {
    collection: String,
  },

  /// Delete an element, collection, or collection item
  Delete {
    item: String,
  },

  /// Check required values, types, and cardinality
  Validate {
    #[arg(long)]
    item: Option<String>,
    #[arg(long)]
    json: bool,
  },

  /// Migrate the draft to a newer toolkit release
  Upgrade {
    /// Target version (default: latest)
    #[arg(long)]
    version: Option<String>,
    /// Allow a major version upgrade
    #[arg(long)]
    force: bool,
    #[arg(long)]
    json: bool,
  },

  /// Run a launch point or command
  Run {
    /// Launch point or command name
    automation: String,
    /// Item expression to run from (default: the draft root)
    #[arg(long)]
    on: Option<String>,
    #[arg(long)]
    json: bool,
  },
}

fn parse_cardinality(input: &str) -> Result<Cardinality, String> {
  Cardinality::parse(input).ok_or_else(|| format!("'{}' is not one of one, zero-or-one, zero-or-many, one-or-many", input))
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // Config, store, and session are loaded once and threaded through every command
  let mut ctx = match KitContext::build(&cwd) {
    Ok(ctx) => ctx,
    Err(e) => {
      logging::init("warn");
      handle_error(e);
    }
  };
  logging::init(&ctx.config.logging.level);

  let result = match cli.command {
    Commands::Init {
      store_dir,
      output_root,
      log_level,
      force,
    } => commands::run_init(
      &ctx,
      commands::InitOptions {
        store_dir,
        output_root,
        log_level,
        force,
      },
    ),
    Commands::Pattern(cmd) => run_pattern(&mut ctx, cmd),
    Commands::Toolkit(cmd) => match cmd {
      ToolkitCommands::Build { version, force, json } => {
        commands::run_toolkit_build(&ctx, version.as_deref(), force, json)
      }
      ToolkitCommands::List { json } => commands::run_toolkit_list(&ctx, json),
    },
    Commands::Draft(cmd) => run_draft(&mut ctx, cmd),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn run_pattern(ctx: &mut KitContext, cmd: PatternCommands) -> KitResult<()> {
  match cmd {
    PatternCommands::Create { name } => commands::run_pattern_create(ctx, &name),
    PatternCommands::Switch { name } => commands::run_pattern_switch(ctx, &name),
    PatternCommands::List { json } => commands::run_pattern_list(ctx, json),
    PatternCommands::View { json } => commands::run_pattern_view(ctx, json),
    PatternCommands::AddAttribute {
      name,
      parent,
      data_type,
      required,
      default,
      choices,
    } => {
      let spec = AttributeSpec {
        name,
        data_type,
        is_required: required,
        default_value: default,
        choices: choices.as_deref().map(commands::split_list).unwrap_or_default(),
      };
      commands::run_add_attribute(ctx, parent.as_deref(), spec)
    }
    PatternCommands::UpdateAttribute {
      name,
      parent,
      rename,
      data_type,
      required,
      default,
      clear_default,
      choices,
    } => {
      let default_value = if clear_default { Some(None) } else { default.map(Some) };
      let update = AttributeUpdate {
        name: rename,
        data_type,
        is_required: required,
        default_value,
        choices: choices.as_deref().map(commands::split_list),
      };
      commands::run_update_attribute(ctx, parent.as_deref(), &name, update)
    }
    PatternCommands::DeleteAttribute { name, parent } => commands::run_delete_attribute(ctx, parent.as_deref(), &name),
    PatternCommands::AddElement {
      name,
      parent,
      cardinality,
      auto_create,
      display_name,
      description,
    } => {
      let spec = ElementSpec {
        name,
        cardinality,
        auto_create,
        display_name,
        description,
      };
      commands::run_add_element(ctx, parent.as_deref(), spec)
    }
    PatternCommands::UpdateElement {
      element,
      rename,
      cardinality,
      auto_create,
      display_name,
      description,
    } => {
      let update = ElementUpdate {
        name: rename,
        cardinality,
        auto_create,
        display_name,
        description,
      };
      commands::run_update_element(ctx, &element, update)
    }
    PatternCommands::DeleteElement { element } => commands::run_delete_element(ctx, &element),
    PatternCommands::AddTemplate { name, file, parent } => {
      commands::run_add_template(ctx, parent.as_deref(), &name, &file)
    }
    PatternCommands::AddTemplateCommand {
      name,
      template,
      path,
      one_off,
      parent,
    } => commands::run_add_template_command(ctx, parent.as_deref(), &name, &template, &path, one_off),
    PatternCommands::UpdateTemplateCommand { name, one_off, path } => {
      commands::run_update_template_command(ctx, &name, one_off, path)
    }
    PatternCommands::AddCliCommand {
      name,
      app,
      args,
      parent,
    } => commands::run_add_cli_command(ctx, parent.as_deref(), &name, &app, &args),
    PatternCommands::AddLaunchPoint {
      name,
      commands: command_list,
      parent,
    } => commands::run_add_launch_point(ctx, parent.as_deref(), &name, &commands::split_list(&command_list)),
    PatternCommands::UpdateLaunchPoint { name, add, remove } => {
      commands::run_update_launch_point(ctx, &name, &commands::split_list(&add), &commands::split_list(&remove))
    }
    PatternCommands::DeleteAutomation { name } => commands::run_delete_automation(ctx, &name),
  }
}

fn run_draft(ctx: &mut KitContext, cmd: DraftCommands) -> KitResult<()> {
  match cmd {
    DraftCommands::New { toolkit, name, version } => {
      commands::run_draft_new(ctx, &toolkit, &name, version.as_deref())
    }
    DraftCommands::Switch { name } => commands::run_draft_switch(ctx, &name),
    DraftCommands::List { json } => commands::run_draft_list(ctx, json),
    DraftCommands::View { item, ancestry, json } => commands::run_draft_view(ctx, item.as_deref(), ancestry, json),
    DraftCommands::Materialise { item, value } => commands::run_draft_materialise(ctx, &item, value.as_deref()),
    DraftCommands::AddItem {
      collection,
      assignments,
    } => commands::run_draft_add_item(ctx, &collection, &assignments),
    DraftCommands::Set { assignments, item } => commands::run_draft_set(ctx, item.as_deref(), &assignments),
    DraftCommands::Reset { item } => commands::run_draft_reset(ctx, item.as_deref()),
    DraftCommands::Clear { collection } => commands::run_draft_clear(ctx, &collection),
    DraftCommands::Delete { item } => commands::run_draft_delete(ctx, &item),
    DraftCommands::Validate { item, json } => commands::run_draft_validate(ctx, item.as_deref(), json),
    DraftCommands::Upgrade { version, force, json } => {
      commands::run_draft_upgrade(ctx, version.as_deref(), force, json)
    }
    DraftCommands::Run { automation, on, json } => commands::run_draft_run(ctx, &automation, on.as_deref(), json),
  }
}

fn handle_error(err: KitError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
