//! CLI argument parsing with clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagepick_core::dom::Point;
use pagepick_core::protocol::Role;

const PAGE_HELP: &str = "Page fixture (JSON) to load";

/// Point at page elements and capture them as chat context.
///
/// Loads a page fixture, replays pointer events through the element picker
/// and prints structured element snapshots as JSON.
#[derive(Debug, Parser)]
#[command(name = "pagepick", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Arm the picker, replay pointer moves and a click, print the pick
    #[command(after_help = "\
Examples:
  pagepick pick page.json --click 20,50                    # Pick the element at (20, 50)
  pagepick pick page.json --move 5,5 --move 20,50 --click 20,50
  pagepick pick page.json --click 20,50 --question 'Why is this red?' --role tester
  pagepick pick page.json --click 20,50 --no-host-root     # Page has no chat widget")]
    Pick(PickArgs),

    /// Snapshot the element at a point without arming a picker
    #[command(after_help = "\
Examples:
  pagepick snapshot page.json --at 20,50")]
    Snapshot(AtArgs),

    /// Print the locator of the element at a point
    #[command(after_help = "\
Examples:
  pagepick locate page.json --at 20,50                     # e.g. //*[@id=\"x\"]")]
    Locate(AtArgs),

    /// Find the element a locator points at and snapshot it
    #[command(after_help = "\
Examples:
  pagepick resolve page.json '//*[@id=\"x\"]'
  pagepick resolve page.json /html/body/div[2]/div[2]")]
    Resolve(ResolveArgs),

    /// List every element with a descriptor and positional locator
    Elements(PageArgs),

    /// Rank elements against a free-text descriptor
    #[command(
        name = "match",
        after_help = "\
Examples:
  pagepick match page.json 'button login Sign in'
  pagepick match page.json 'footer' --limit 5"
    )]
    Match(MatchArgs),

    /// Show an end-to-end usage example
    Examples,
}

#[derive(Debug, clap::Args)]
pub struct PageArgs {
    #[arg(help = PAGE_HELP)]
    pub page: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct PickArgs {
    #[arg(help = PAGE_HELP)]
    pub page: PathBuf,

    /// Pointer move before the click (repeatable, viewport px)
    #[arg(long = "move", value_name = "X,Y", value_parser = parse_point)]
    pub moves: Vec<Point>,

    /// Click that commits the pick (viewport px)
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pub click: Point,

    /// Wrap the pick in a chat query with this question
    #[arg(short, long)]
    pub question: Option<String>,

    /// Audience for the chat query
    #[arg(short, long, default_value = "developer", value_parser = parse_role)]
    pub role: Role,

    /// Trace text to attach to the chat query
    #[arg(long)]
    pub trace: Option<String>,

    /// Id of the host UI root to exclude [default: $PAGEPICK_HOST_ROOT or pagepick-host]
    #[arg(long, value_name = "ID", conflicts_with = "no_host_root")]
    pub host_root: Option<String>,

    /// The page has no host UI; nothing is excluded
    #[arg(long)]
    pub no_host_root: bool,
}

#[derive(Debug, clap::Args)]
pub struct AtArgs {
    #[arg(help = PAGE_HELP)]
    pub page: PathBuf,

    /// Viewport point
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pub at: Point,
}

#[derive(Debug, clap::Args)]
pub struct ResolveArgs {
    #[arg(help = PAGE_HELP)]
    pub page: PathBuf,

    /// Locator produced by `pagepick locate` or a snapshot's xpath
    pub locator: String,
}

#[derive(Debug, clap::Args)]
pub struct MatchArgs {
    #[arg(help = PAGE_HELP)]
    pub page: PathBuf,

    /// Free-text description, e.g. "button login Sign in"
    pub descriptor: String,

    /// Maximum number of candidates
    #[arg(short, long, default_value_t = 3)]
    pub limit: usize,
}

/// Parse `X,Y` into a viewport point.
fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("invalid coordinate '{}'", v.trim()))
    };
    Ok(Point::new(coord(x)?, coord(y)?))
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.message)
}

/// End-to-end example text for the `examples` command.
pub const EXAMPLES_TEXT: &str = r#"End-to-end example: Ask about a button on a page

This example loads a page fixture, finds the button, picks it and builds
the chat payload a widget would send.

# 1. Write a page fixture (rects are page px; the host UI has id pagepick-host)
cat > /tmp/page.json <<'EOF'
{
  "viewport": { "width": 1280, "height": 720 },
  "root": { "tag": "html", "children": [
    { "tag": "body", "rect": { "x": 0, "y": 0, "width": 1280, "height": 720 },
      "children": [
        { "tag": "button", "attributes": { "id": "login", "class": "btn primary" },
          "rect": { "x": 40, "y": 80, "width": 120, "height": 32 },
          "children": [ { "text": "Sign in" } ] },
        { "tag": "div", "attributes": { "id": "pagepick-host" },
          "rect": { "x": 1000, "y": 560, "width": 260, "height": 140 } }
      ] }
  ] }
}
EOF

# 2. List the elements and their positional locators
pagepick elements /tmp/page.json

# 3. Find the button from a loose description
pagepick match /tmp/page.json 'button login sign in'

# 4. Hover, then click it; prints the snapshot after the confirmation flash
pagepick pick /tmp/page.json --move 50,90 --click 50,90

# 5. Same pick, wrapped in a chat query for a tester
pagepick pick /tmp/page.json --click 50,90 --question 'What should I test here?' --role tester

# 6. Replay the locator later
pagepick resolve /tmp/page.json '//*[@id="login"]'

# Clicking inside the host UI (e.g. --click 1010,570) never picks anything.
"#;
