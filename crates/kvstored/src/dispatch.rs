//! Static dispatch table (§4.I) — name → handler + arity bounds,
//! matched case-insensitively. `max_args = 0` means unbounded.

use crate::commands::{self, CommandContext, Outcome};
use crate::reply;

type Handler = fn(&CommandContext, &[&str], &mut Vec<u8>) -> Outcome;

struct Entry {
    name: &'static str,
    handler: Handler,
    min_args: usize,
    max_args: usize,
}

const TABLE: &[Entry] = &[
    Entry { name: "PING", handler: commands::ping, min_args: 0, max_args: 1 },
    Entry { name: "INFO", handler: commands::info, min_args: 0, max_args: 0 },
    Entry { name: "SET", handler: commands::set, min_args: 2, max_args: 0 },
    Entry { name: "GET", handler: commands::get, min_args: 1, max_args: 1 },
    Entry { name: "DEL", handler: commands::del, min_args: 1, max_args: 1 },
    Entry { name: "EXISTS", handler: commands::exists, min_args: 1, max_args: 1 },
    Entry { name: "KEYS", handler: commands::keys, min_args: 0, max_args: 0 },
    Entry { name: "CLEAR", handler: commands::clear, min_args: 0, max_args: 0 },
    Entry { name: "STATS", handler: commands::stats, min_args: 0, max_args: 0 },
    Entry { name: "SAVE", handler: commands::save, min_args: 0, max_args: 1 },
    Entry { name: "LOAD", handler: commands::load, min_args: 0, max_args: 1 },
    Entry { name: "BACKUP", handler: commands::backup, min_args: 0, max_args: 1 },
    Entry { name: "QUIT", handler: commands::quit, min_args: 0, max_args: 0 },
];

fn find(name: &str) -> Option<&'static Entry> {
    TABLE.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

/// Dispatch one already-tokenized command line. Unknown names and
/// arity violations write an `-ERR` reply without invoking any
/// handler (§4.I); both count as request-level errors for INFO/STATS.
pub fn dispatch(ctx: &CommandContext, tokens: &[&str], out: &mut Vec<u8>) -> Outcome {
    ctx.stats.record_request();

    let Some((&name, args)) = tokens.split_first() else {
        return Outcome::Continue;
    };

    let Some(entry) = find(name) else {
        ctx.stats.record_error();
        let _ = reply::error(out, &format!("unknown command '{name}'"));
        return Outcome::Continue;
    };

    let arity_ok = args.len() >= entry.min_args && (entry.max_args == 0 || args.len() <= entry.max_args);
    if !arity_ok {
        ctx.stats.record_error();
        let _ = reply::error(out, &format!("wrong number of arguments for '{name}'"));
        return Outcome::Continue;
    }

    tracing::debug!(command = entry.name, argc = args.len(), "dispatching command");
    (entry.handler)(ctx, args, out)
}
