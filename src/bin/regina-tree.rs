//! A line-oriented front-end to the packet tree: open data files, walk and
//! edit the tree, run operations and talk to the Python console.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::rc;

use regina_ui::engine::basic::BasicEngine;
use regina_ui::engine::Move;
use regina_ui::io;
use regina_ui::io::PacketHandler;
use regina_ui::model::packet::{PacketKind, PacketRef};
use regina_ui::model::polynomial::Invariant;
use regina_ui::model::preferences;
use regina_ui::view::interaction::{CloseChoice, Interaction, MessageKind};
use regina_ui::view::operation::{Motion, Operation, SnapPeaOp, TriangulationOp};
use regina_ui::view::window::DocumentWindow;
use regina_ui::view::Application;

fn setup_tracing() {
    let level = std::env::var("REGINA_LOG").ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::WARN);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {}", e);
    }
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
    }
}

/// Dialogs become questions on the terminal.
struct Terminal;

impl Interaction for Terminal {
    fn message(&self, kind: MessageKind, text: &str, detail: Option<&str>) {
        println!("[{}] {}", kind.title(), text);
        if let Some(detail) = detail {
            for line in detail.lines() {
                println!("    {}", line);
            }
        }
    }

    fn confirm(&self, text: &str, detail: Option<&str>) -> bool {
        self.message(MessageKind::Information, text, detail);
        matches!(read_line("[y/N] ").as_deref().map(str::trim), Some("y" | "Y" | "yes"))
    }

    fn ask_close(&self, document: &str) -> CloseChoice {
        println!("{} has unsaved changes.", document);
        match read_line("[s]ave, [d]iscard or [c]ancel? ").as_deref().map(str::trim) {
            Some("s") => CloseChoice::Save,
            Some("d") => CloseChoice::Discard,
            _ => CloseChoice::Cancel,
        }
    }

    fn ask_text(&self, prompt: &str, initial: &str) -> Option<String> {
        if !initial.is_empty() {
            println!("(currently: {})", initial);
        }
        read_line(&format!("{} ", prompt))
    }

    fn choose_packet(&self, prompt: &str, candidates: &[PacketRef]) -> Option<PacketRef> {
        println!("{}", prompt);
        for (i, packet) in candidates.iter().enumerate() {
            println!("  {}: {}", i, packet.human_label());
        }
        let index: usize = read_line("number: ")?.trim().parse().ok()?;
        candidates.get(index).cloned()
    }

    fn choose_path(&self, title: &str, filter: &str, _save: bool) -> Option<PathBuf> {
        let path = read_line(&format!("{} ({}): ", title, filter))?;
        let path = path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    fn progress(&self, description: &str, fraction: Option<f64>) -> bool {
        match fraction {
            Some(fraction) => eprint!("\r{}: {:3.0}%", description, fraction * 100.0),
            None => eprint!("\r{}...", description),
        }
        true
    }

    fn progress_done(&self) {
        eprintln!();
    }
}

fn kind_named(name: &str) -> Option<PacketKind> {
    PacketKind::ALL.into_iter().find(|kind| kind.name().eq_ignore_ascii_case(name))
}

fn handler_named(handlers: Vec<io::Handler>, name: &str) -> Option<io::Handler> {
    handlers.into_iter().find(|h| h.name().eq_ignore_ascii_case(name))
}

fn triangulation_op_named(name: &str) -> Option<TriangulationOp> {
    use TriangulationOp::*;
    [Simplify, Orient, Reflect, Barycentric, IdealToFinite, FiniteToIdeal, DoubleCover,
     SplitIntoComponents, ConnectedSumWith, ConnectedSumDecomposition, MakeZeroEfficient, ToSnapPea]
        .into_iter()
        .find(|op| op.name().eq_ignore_ascii_case(name))
}

/// Turns one command line into an operation, for the commands that are
/// operations at all.
fn operation(command: &str, rest: &str) -> Option<Operation> {
    Some(match command {
        "clone" => Operation::Clone { subtree: false },
        "clone-tree" => Operation::Clone { subtree: true },
        "rename" => Operation::Rename,
        "delete" => Operation::Delete,
        "up" => Operation::Move(Motion::Up),
        "down" => Operation::Move(Motion::Down),
        "jump-up" => Operation::Move(Motion::JumpUp),
        "jump-down" => Operation::Move(Motion::JumpDown),
        "top" => Operation::Move(Motion::First),
        "bottom" => Operation::Move(Motion::Last),
        "new" => Operation::NewPacket(kind_named(rest)?),
        "import" => Operation::Import(handler_named(io::importers(), rest)?),
        "export" => Operation::Export(handler_named(io::exporters(), rest)?),
        "tri" => Operation::Triangulation(triangulation_op_named(rest)?),
        "move" => {
            let (name, element) = rest.rsplit_once(' ')?;
            let mv = Move::ALL.into_iter().find(|mv| mv.name() == name.trim())?;
            Operation::ElementaryMove(mv, element.trim().parse().ok()?)
        },
        "census" => Operation::CensusLookup,
        "randomise" => Operation::SnapPea(SnapPeaOp::Randomise),
        "canonize" => Operation::SnapPea(SnapPeaOp::Canonize),
        "vertex-link" => Operation::SnapPea(SnapPeaOp::VertexLink { cusp: rest.parse().ok()? }),
        "to-regina" => Operation::SnapPea(SnapPeaOp::ToNative),
        "invariant" => Operation::ComputeInvariant(Invariant::ALL.into_iter().find(|i| i.name().eq_ignore_ascii_case(rest))?),
        _ => return None,
    })
}

const HELP: &str = "\
tree                     show the packet tree
select N                 select row N of the tree
view [TAB]               show the selected packet, optionally on another tab
open PATH | example PATH open a data file
drop URL...              open dropped file URLs
save | save-as           write the document
windows | window N       list or switch windows
close | quit             close this window, or everything
py LINE | run            talk to the Python console, or run the selected script
clone, clone-tree, rename, delete, up, down, jump-up, jump-down, top, bottom
new KIND, import FORMAT, export FORMAT, tri OPERATION, move NAME ELEMENT
moves, census, randomise, canonize, vertex-link N, to-regina, invariant NAME";

fn print_tree(w: &DocumentWindow) {
    println!("{}", w.title());
    for (i, row) in w.tree().rows().iter().enumerate() {
        let marker = if row.selected { '*' } else { ' ' };
        let tags = row.tags.as_ref().map(|tags| format!(" [{}]", tags.join(", "))).unwrap_or_default();
        println!("{}{:3} {}{}{}", marker, i, "  ".repeat(row.depth), row.label, tags);
    }
}

fn view(w: &mut DocumentWindow, tab: &str) {
    let Some(packet) = w.tree().selected() else {
        println!("Nothing is selected.");
        return;
    };
    let index = w.open_pane(&packet);
    let id = w.panes()[index].id();
    let Some(pane) = w.pane_mut(id) else { return };
    if !tab.is_empty() && !pane.set_tab_by_name(tab) {
        println!("No such tab: {} (tabs are {})", tab, pane.tabs().join(", "));
    }
    println!("== {} ==", pane.title());
    println!("{}", pane.render());
}

fn main() {
    setup_tracing();

    let prefs = preferences::global();
    if let Err(e) = prefs.load() {
        tracing::info!(error = %e, "starting with default preferences");
    }

    let interaction: rc::Rc<dyn Interaction> = rc::Rc::new(Terminal);
    let mut app = match Application::new(std::sync::Arc::new(BasicEngine), prefs, interaction) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("could not start the runtime: {}", e);
            std::process::exit(1);
        },
    };

    let mut current = app.start();
    for arg in std::env::args().skip(1) {
        if let Some(index) = app.open_path(&PathBuf::from(arg)) {
            current = index;
        }
    }

    while let Some(line) = read_line("regina> ") {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').map(|(c, r)| (c, r.trim())).unwrap_or((line, ""));
        if command.is_empty() {
            continue;
        }

        if command == "quit" {
            if app.quit() {
                return;
            }
            continue;
        }
        if command == "help" {
            println!("{}", HELP);
            continue;
        }
        if command == "windows" {
            for (i, w) in app.windows().iter().enumerate() {
                println!("{}{} {}", if i == current { '*' } else { ' ' }, i, w.title());
            }
            continue;
        }

        let opened = match command {
            "open" => Some(app.open_path(&PathBuf::from(rest)).into_iter().collect::<Vec<_>>()),
            "example" => Some(app.open_example(&PathBuf::from(rest)).into_iter().collect()),
            "drop" => Some(app.open_urls(rest.split_whitespace())),
            _ => None,
        };
        if let Some(opened) = opened {
            current = opened.last().copied().unwrap_or(current);
            continue;
        }

        if command == "window" {
            match rest.parse::<usize>() {
                Ok(index) if index < app.windows().len() => current = index,
                _ => println!("No such window."),
            }
            continue;
        }
        if command == "close" {
            if app.close_window(current) {
                if app.windows().is_empty() {
                    app.quit();
                    return;
                }
                current = current.min(app.windows().len() - 1);
            }
            continue;
        }

        let Some(w) = app.window_mut(current) else { return };
        w.pump_queue();
        match command {
            "tree" => print_tree(w),
            "select" => {
                let row = rest.parse::<usize>().ok().and_then(|i| w.tree().rows().get(i).cloned());
                match row.and_then(|row| w.tree().find(row.id)).and_then(|item| item.packet()) {
                    Some(packet) => w.select(&packet),
                    None => println!("No such row."),
                }
            },
            "view" => view(w, rest),
            "save" => { w.save(); },
            "save-as" => { w.save_as(); },
            "py" => {
                let console = w.open_console();
                let seen = console.log().len();
                console.execute_line(rest);
                for line in console.log().iter().skip(seen + 1) {
                    println!("{}", line.text);
                }
            },
            "run" => {
                if let Some(packet) = w.tree().selected() {
                    w.run_script(&packet);
                    if let Some(console) = w.console() {
                        println!("{}", console.plain_text());
                    }
                }
            },
            "moves" => {
                for (mv, elements) in w.move_candidates() {
                    let elements: Vec<String> = elements.iter().map(usize::to_string).collect();
                    println!("{:>4}: {}", mv.name(), elements.join(" "));
                }
            },
            _ => match operation(command, rest) {
                Some(op) => { w.perform(op); },
                None => println!("Unknown command; try \"help\"."),
            },
        }
    }

    app.quit();
}
