//! Command handlers (§4.L) — PING, INFO, SET, GET, DEL, EXISTS, KEYS,
//! CLEAR, STATS, SAVE, LOAD, QUIT. Each handler writes its reply
//! directly into the connection's write buffer and returns whether
//! the connection should move to CLOSING afterward.

use std::path::PathBuf;

use kvstore_core::{ByteSpan, Value};
use kvstore_store::{ConnectionRegistry, Stats, Store};

use crate::reply;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MAX_KEY_LEN: usize = 1024 * 1024;
pub const MAX_VALUE_LEN: usize = 1024 * 1024;

/// Everything a handler needs besides its own arguments.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub stats: &'a Stats,
    pub registry: &'a ConnectionRegistry,
    pub db_file: &'a PathBuf,
}

/// What the reactor should do with the connection after a handler runs.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Close,
}

type HandlerResult = Outcome;

pub fn ping(_ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    match args.first() {
        None => {
            let _ = reply::status(out, "PONG");
        }
        Some(msg) => {
            let _ = reply::bulk(out, msg.as_bytes());
        }
    }
    Outcome::Continue
}

pub fn info(ctx: &CommandContext, _args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let stats = ctx.store.stats();
    let body = format!(
        "version:{}\r\nuptime_seconds:{}\r\nconnections:{}\r\ntotal_requests:{}\r\ntotal_errors:{}\r\nkeys:{}\r\n",
        VERSION,
        ctx.stats.uptime_secs(),
        ctx.registry.active_count(),
        ctx.stats.total_requests(),
        ctx.stats.total_errors(),
        stats.keys,
    );
    let _ = reply::bulk(out, body.as_bytes());
    Outcome::Continue
}

/// `SET key value[ extra...]` — tokens `1..` are rejoined with single
/// spaces (§4.H, §9: the multi-space limitation of plain whitespace
/// tokenization is a known, accepted gap).
pub fn set(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let key = args[0];
    let value = args[1..].join(" ");

    if key.is_empty() || key.len() > MAX_KEY_LEN {
        let _ = reply::error(out, "Invalid key");
        return Outcome::Continue;
    }
    if value.len() > MAX_VALUE_LEN {
        let _ = reply::error(out, "Value too large");
        return Outcome::Continue;
    }

    match ctx
        .store
        .put(key.as_bytes(), &Value::String(ByteSpan::from_slice(value.as_bytes())))
    {
        Ok(()) => {
            let _ = reply::status(out, "OK");
        }
        Err(e) => {
            let _ = reply::error(out, &e.to_string());
        }
    }
    Outcome::Continue
}

pub fn get(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let key = args[0];
    match ctx.store.get(key.as_bytes()) {
        Ok(value) => {
            let _ = reply::bulk(out, &value.render_text());
        }
        Err(_) => {
            let _ = reply::nil_bulk(out);
        }
    }
    Outcome::Continue
}

pub fn del(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let removed = ctx.store.delete(args[0].as_bytes());
    let _ = reply::integer(out, if removed { 1 } else { 0 });
    Outcome::Continue
}

pub fn exists(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let present = ctx.store.exists(args[0].as_bytes());
    let _ = reply::integer(out, if present { 1 } else { 0 });
    Outcome::Continue
}

pub fn keys(ctx: &CommandContext, _args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let keys = ctx.store.keys();
    let items: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
    let _ = reply::array_of_bulks(out, items.into_iter());
    Outcome::Continue
}

pub fn clear(ctx: &CommandContext, _args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    ctx.store.clear();
    let _ = reply::status(out, "OK");
    Outcome::Continue
}

pub fn stats(ctx: &CommandContext, _args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let table_stats = ctx.store.stats();
    let body = format!(
        "keys:{}\r\ncapacity:{}\r\nload_factor:{:.4}\r\narena_bytes_in_use:{}\r\n",
        table_stats.keys, table_stats.bucket_count, table_stats.load_factor, table_stats.arena_bytes_in_use,
    );
    let _ = reply::bulk(out, body.as_bytes());
    Outcome::Continue
}

pub fn save(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let path = args.first().map(PathBuf::from).unwrap_or_else(|| ctx.db_file.clone());
    match ctx.store.save(&path) {
        Ok(()) => {
            let _ = reply::status(out, "OK");
        }
        Err(e) => {
            let _ = reply::error(out, &e.to_string());
        }
    }
    Outcome::Continue
}

pub fn load(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let path = args.first().map(PathBuf::from).unwrap_or_else(|| ctx.db_file.clone());
    match ctx.store.load(&path) {
        Ok(()) => {
            let _ = reply::status(out, "OK");
        }
        Err(e) => {
            let _ = reply::error(out, &e.to_string());
        }
    }
    Outcome::Continue
}

/// `BACKUP [path]` — with no argument, writes a timestamped sibling of
/// the db file (`<db-file>.backup.<YYYYMMDD-HHMMSS>`, §4.E); with an
/// explicit path, saves there directly with no timestamp suffix.
pub fn backup(ctx: &CommandContext, args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let explicit_path: Option<PathBuf> = args.first().map(PathBuf::from);
    let result = match explicit_path {
        Some(path) => ctx.store.save(&path).map(|()| path),
        None => {
            let stamp = crate::timefmt::utc_stamp(std::time::SystemTime::now());
            ctx.store.backup(ctx.db_file, &stamp)
        }
    };
    match result {
        Ok(path) => {
            let _ = reply::bulk(out, path.to_string_lossy().as_bytes());
        }
        Err(e) => {
            let _ = reply::error(out, &e.to_string());
        }
    }
    Outcome::Continue
}

pub fn quit(_ctx: &CommandContext, _args: &[&str], out: &mut Vec<u8>) -> HandlerResult {
    let _ = reply::status(out, "OK");
    Outcome::Close
}
