//! Console Front End
//!
//! A line-oriented presenter and command loop for driving the interaction
//! core from a terminal.

use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::interaction::InteractionCoordinator;
use crate::item::{Counterpart, Inventory};
use crate::presentation::{PendingChoice, PendingText, Presenter};
use crate::shop::Shop;

// ============================================================================
// Presenter
// ============================================================================

/// Panel currently waiting on the player
#[derive(Debug)]
pub enum Prompt {
    Text(PendingText),
    Choice(PendingChoice),
}

pub struct ConsolePresenter<W: Write> {
    out: W,
    pending: Option<Prompt>,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, pending: None }
    }

    pub fn take_prompt(&mut self) -> Option<Prompt> {
        self.pending.take()
    }

    /// Put back a prompt the player answered with the wrong kind of input
    pub fn restore_prompt(&mut self, prompt: Prompt) {
        self.pending = Some(prompt);
    }

    pub fn has_prompt(&self) -> bool {
        self.pending.is_some()
    }

    pub fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Console write failed: {}", e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Console flush failed: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn show_text(&mut self, lines: &[String], reply: PendingText) {
        for line in lines {
            self.emit(line);
        }
        self.emit("  (press enter)");
        self.flush();
        self.pending = Some(Prompt::Text(reply));
    }

    fn show_choice(&mut self, question: &str, options: &[String], reply: PendingChoice) {
        self.emit(question);
        for (i, option) in options.iter().enumerate() {
            self.emit(&format!("  {}. {}", i + 1, option));
        }
        self.flush();
        self.pending = Some(Prompt::Choice(reply));
    }

    fn open_inventory(&mut self, player: &Inventory, counterpart: Option<&Counterpart>) {
        self.emit("Inventory:");
        if player.is_empty() {
            self.emit("  (empty)");
        }
        for stack in player.stacks() {
            self.emit(&format!("  {} x{}", stack.item_id, stack.quantity));
        }
        if let Some(other) = counterpart {
            self.emit(&format!("{}:", other.owner_id));
            for stack in other.inventory.stacks() {
                self.emit(&format!("  {} x{}", stack.item_id, stack.quantity));
            }
        }
        self.flush();
    }

    fn open_trade(&mut self, shop: &Shop, player: &Inventory) {
        self.emit(&format!("== {} ==", shop.display_name));
        for offer in &shop.offers {
            self.emit(&format!(
                "  {:<12} buy {:>4}  sell {:>4}  stock {}",
                offer.item,
                offer.buy_price,
                offer.sell_price,
                shop.stock.count(&offer.item)
            ));
        }
        self.emit(&format!("You have {} stacks. Type 'close' to leave.", player.stacks().len()));
        self.flush();
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line: close the open text panel
    Continue,
    /// 1-based option number
    Choose(usize),
    Talk(String),
    Near(i32, i32),
    Inventory,
    Buy(String, u32),
    Sell(String, u32),
    Close,
    Quests,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Continue);
        };

        if let Ok(n) = head.parse::<usize>() {
            if n == 0 {
                return Err("options are numbered from 1".to_string());
            }
            return Ok(Command::Choose(n));
        }

        let command = match head {
            "talk" => Command::Talk(required(words.next(), "talk <npc>")?.to_string()),
            "near" => {
                let x = number(words.next(), "near <x> <y>")?;
                let y = number(words.next(), "near <x> <y>")?;
                Command::Near(x, y)
            }
            "inv" | "inventory" => Command::Inventory,
            "buy" | "sell" => {
                let item = required(words.next(), "buy|sell <item> [n]")?.to_string();
                let quantity = match words.next() {
                    Some(n) => number(Some(n), "buy|sell <item> [n]")?,
                    None => 1,
                };
                if head == "buy" {
                    Command::Buy(item, quantity)
                } else {
                    Command::Sell(item, quantity)
                }
            }
            "close" => Command::Close,
            "quests" => Command::Quests,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(command)
    }
}

fn required<'a>(word: Option<&'a str>, usage: &str) -> Result<&'a str, String> {
    word.ok_or_else(|| format!("usage: {}", usage))
}

fn number<T: std::str::FromStr>(word: Option<&str>, usage: &str) -> Result<T, String> {
    required(word, usage)?
        .parse()
        .map_err(|_| format!("usage: {}", usage))
}

const HELP: &str = "\
Commands:
  talk <npc>          talk to an NPC by id
  near <x> <y>        talk to the nearest NPC around a tile
  <n>                 pick option n of an open choice
  (enter)             close an open text panel
  inv                 show your inventory
  buy <item> [n]      buy from the open shop
  sell <item> [n]     sell to the open shop
  close               leave the conversation or shop
  quests              list quests and their status
  quit";

// ============================================================================
// Driver
// ============================================================================

pub type Console<W> = InteractionCoordinator<ConsolePresenter<W>>;

/// Read commands until `quit` or end of input
pub fn run<R: BufRead, W: Write>(game: &mut Console<W>, input: R) -> std::io::Result<()> {
    game.presenter_mut().emit("Type 'help' for commands.");
    for line in input.lines() {
        let line = line?;
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(game, command),
            Err(message) => game.presenter_mut().emit(&message),
        }
        log_quest_events(game);
    }
    Ok(())
}

pub fn execute<W: Write>(game: &mut Console<W>, command: Command) {
    match command {
        Command::Continue => match game.presenter_mut().take_prompt() {
            Some(Prompt::Text(reply)) => {
                if let Err(e) = game.on_text_closed(reply) {
                    game.presenter_mut().emit(&format!("That conversation is over ({}).", e));
                }
            }
            Some(prompt) => game.presenter_mut().restore_prompt(prompt),
            None => {}
        },
        Command::Choose(n) => match game.presenter_mut().take_prompt() {
            Some(Prompt::Choice(reply)) => {
                let index = n.checked_sub(1).unwrap_or(usize::MAX);
                if game.on_choice_selected(reply, index).is_err() {
                    game.presenter_mut().emit("Pick one of the listed options.");
                }
            }
            Some(prompt) => game.presenter_mut().restore_prompt(prompt),
            None => game.presenter_mut().emit("Nothing to choose."),
        },
        Command::Talk(npc_id) => {
            if !game.on_interact(&npc_id) {
                game.presenter_mut().emit(&format!("{} has nothing to say.", npc_id));
            }
        }
        Command::Near(x, y) => {
            if !game.interact_nearby(x, y) {
                game.presenter_mut().emit("Nobody is close enough.");
            }
        }
        Command::Inventory => game.open_inventory(),
        Command::Buy(item, quantity) => match game.buy(&item, quantity) {
            Ok(receipt) => {
                let line = format!("Bought {} x{} for {}.", receipt.item_id, receipt.quantity, receipt.coins);
                game.presenter_mut().emit(&line);
            }
            Err(e) => game.presenter_mut().emit(&format!("Can't buy: {}", e)),
        },
        Command::Sell(item, quantity) => match game.sell(&item, quantity) {
            Ok(receipt) => {
                let line = format!("Sold {} x{} for {}.", receipt.item_id, receipt.quantity, receipt.coins);
                game.presenter_mut().emit(&line);
            }
            Err(e) => game.presenter_mut().emit(&format!("Can't sell: {}", e)),
        },
        Command::Close => {
            if game.session().is_some() {
                game.presenter_mut().take_prompt();
                game.cancel_dialogue();
            } else if !game.close_trade() {
                game.presenter_mut().emit("Nothing to close.");
            }
        }
        Command::Quests => {
            let lines: Vec<String> = game
                .quests()
                .all()
                .map(|q| {
                    let status = game.quests().log().status(&q.id);
                    format!("  {:<16} {:<10} ({})", q.id, status.as_str(), q.npc_id)
                })
                .collect();
            game.presenter_mut().emit("Quests:");
            for line in &lines {
                game.presenter_mut().emit(line);
            }
        }
        Command::Help => game.presenter_mut().emit(HELP),
        Command::Quit => {}
    }
}

fn log_quest_events<W: Write>(game: &mut Console<W>) {
    for event in game.quests_mut().drain_events() {
        info!(event = event.event_type(), quest = event.quest_id(), "Quest event");
    }
}
