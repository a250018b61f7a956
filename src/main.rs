use clap::{Parser, Subcommand};

mod commands;
mod context;
mod forge;
mod git;
mod prstack;
mod reconcile;
mod repo;
mod shell;
mod stack;
mod store;
mod sync;
mod ui;

use context::ExecutionContext;

#[derive(Parser)]
#[command(
    name = "ezs",
    about = "ezstack: stacked pull requests over git worktrees",
    long_about = None,
    version,
    disable_help_subcommand = true,
    help_template = "\
{about}

{usage-heading} {usage}

Work on a Stack:
  new         Create a stacked branch in its own worktree
  goto        Jump to a branch's worktree                 [go]
  list        Show all stacks
  status      Show sync, PR, and CI state

Keep in Sync:
  sync        Rebase stacks onto fresh upstream state
  update      Reconcile tracked state with git reality

Pull Requests:
  pr          Create and update PRs with stack blocks

Shape a Stack:
  delete      Delete a branch and its worktree            [del, rm]
  reparent    Move a branch under a new parent
  stack       Register an existing worktree as a stack
  unstack     Stop tracking a branch
  from-remote Import a colleague's branch as a stack root

Setup:
  config      Configuration settings
  --shell-init  Print the shell wrapper function

Options:
  -v, --verbose  Show git/forge commands being executed
  -h, --help     Print help
  -V, --version  Print version

Run '{bin} <command> --help' for more information on a command.
Add 'eval \"$(ezs --shell-init)\"' to your shell rc so cd-emitting
commands can change your directory.
"
)]
struct Cli {
    /// Show git/forge commands being executed
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Print a shell function that wraps ezs and evals its cd directives
    #[arg(long = "shell-init")]
    shell_init: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a stacked branch in its own worktree
    New {
        /// Name of the new branch
        name: String,
        /// Parent branch (defaults to the current branch, or the base branch)
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Show all stacks
    List,
    /// Show sync, PR, and CI state
    Status {
        /// Include every stack, not just the current one
        #[arg(long)]
        all: bool,
    },
    /// Rebase stacks onto fresh upstream state
    Sync {
        /// Accept every rebase, push, and cleanup without prompting
        #[arg(long)]
        auto: bool,
        /// Skip merged-branch cleanup
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Jump to a branch's worktree (prints a cd directive)
    #[command(visible_alias = "go")]
    Goto {
        /// Branch name or stack hash prefix (≥ 3 chars)
        target: String,
    },
    /// Create and update PRs with stack blocks
    Pr {
        #[command(subcommand)]
        cmd: commands::pr::PrCmd,
    },
    /// Delete a branch and its worktree
    #[command(visible_alias = "del")]
    #[command(visible_alias = "rm")]
    Delete {
        name: String,
        /// Skip confirmation; reparent children instead of refusing
        #[arg(short, long)]
        force: bool,
    },
    /// Move a branch under a new parent
    Reparent {
        /// Branch to move (defaults to the current branch)
        branch: Option<String>,
        /// New parent branch (may be the base branch)
        #[arg(long)]
        onto: String,
        /// Replay the branch's own commits onto the new parent
        #[arg(long)]
        rebase: bool,
        /// Pick the commits to replay in your editor (requires --rebase)
        #[arg(short = 'i', long, requires = "rebase")]
        interactive: bool,
    },
    /// Register an existing worktree's branch as a new stack
    Stack {
        /// Branch to register (defaults to the current branch)
        name: Option<String>,
    },
    /// Stop tracking a branch (children reparent to its parent)
    Unstack { name: String },
    /// Import a colleague's upstream branch as a read-only stack root
    FromRemote {
        /// Remote branch name
        branch: String,
        /// Name for the local child branch (defaults to <branch>-local)
        child: Option<String>,
    },
    /// Reconcile tracked state with git reality
    Update {
        /// Apply every fix without prompting
        #[arg(long)]
        auto: bool,
        /// Preview without changing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Configuration settings
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    ExecutionContext::init(cli.verbose);

    if cli.shell_init {
        // The wrapper itself goes to stdout: it is meant to be eval'd
        print!("{}", shell::shell_init_script());
        return;
    }

    let Some(command) = cli.command else {
        ui::error("No command given. Run 'ezs --help' for usage.");
        std::process::exit(1);
    };

    let ctx = ExecutionContext::new(cli.verbose);
    let result = context::with_context(ctx, dispatch(command)).await;

    if let Err(e) = result {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::New { name, parent } => commands::new::run(&name, parent),
        Commands::List => commands::list::run(),
        Commands::Status { all } => commands::status::run(all).await,
        Commands::Sync { auto, no_cleanup } => commands::sync::run(auto, no_cleanup).await,
        Commands::Goto { target } => commands::goto::run(&target),
        Commands::Pr { cmd } => commands::pr::run(cmd),
        Commands::Delete { name, force } => commands::delete::run(&name, force),
        Commands::Reparent {
            branch,
            onto,
            rebase,
            interactive,
        } => commands::reparent::run(branch, &onto, rebase, interactive),
        Commands::Stack { name } => commands::stack_cmd::run(name),
        Commands::Unstack { name } => commands::unstack::run(&name),
        Commands::FromRemote { branch, child } => commands::from_remote::run(&branch, child),
        Commands::Update { auto, dry_run } => commands::update::run(auto, dry_run),
        Commands::Config { action } => commands::config_cmd::run(action),
    }
}
