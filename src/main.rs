//! Chessroom server: realtime chess sessions over TCP.
//!
//! Each connection speaks newline delimited JSON. Every line received is one
//! command, every line sent is one server message.
//!
//! Every connection gets a reader thread and a writer thread. Commands run on
//! the worker pool, one at a time per connection.

mod cli;
mod config;

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};

use chessroom_core::error;
use chessroom_core::{
    ChannelTransport, Color, Dispatcher, Game, Handle, MemoryAuth, MemorySessionStore,
};
use chessroom_core::threads::ThreadPool;

use crate::config::Config;

fn main() -> io::Result<()> {
    let env = Env::default().filter_or("CHESSROOM_LOG", "info");
    env_logger::Builder::from_env(env).init();

    let cli = cli::Cli::parse();
    let mut config = Config::load(cli.config_path().as_ref())?;
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }

    let auth = Arc::new(seed_users(&config));
    let store = Arc::new(seed_games(&config)?);
    let dispatcher = Arc::new(Dispatcher::new(store, auth));

    let pool = Arc::new(ThreadPool::new(config.threads).map_err(to_io)?);
    let listener = TcpListener::bind(&config.address)?;
    info!(
        "listening on {} with {} workers",
        listener.local_addr()?,
        pool.len()
    );

    serve(listener, dispatcher, pool);
    Ok(())
}

/// Accept connections until the listener fails, one reader thread each.
fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>, pool: Arc<ThreadPool>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let dispatcher = Arc::clone(&dispatcher);
                let pool = Arc::clone(&pool);
                let reader = thread::Builder::new()
                    .name(String::from("chessroom-reader"))
                    .spawn(move || serve_connection(&dispatcher, &pool, stream));
                if let Err(err) = reader {
                    warn!("could not spawn connection reader: {err}");
                }
            }
            Err(err) => warn!("failed to accept connection: {err}"),
        }
    }
}

fn to_io(err: error::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Register configured users, issuing random tokens to those without one.
fn seed_users(config: &Config) -> MemoryAuth {
    let auth = MemoryAuth::new();
    for user in &config.users {
        match &user.token {
            Some(token) => auth.insert(token, &user.username),
            None => {
                let token = auth.issue(&user.username);
                info!("auth token for {}: {token}", user.username);
            }
        }
    }
    if config.users.is_empty() {
        warn!("no users configured, every command will be unauthorized");
    }
    auth
}

/// Create configured games and seat their players.
fn seed_games(config: &Config) -> io::Result<MemorySessionStore> {
    let store = MemorySessionStore::new();
    for game_config in &config.games {
        let game = match &game_config.fen {
            Some(fen) => Game::from_fen(fen).map_err(to_io)?,
            None => Game::start_position(),
        };
        let id = store.create_with_game(&game_config.name, game);

        let seats = [
            (Color::White, &game_config.white),
            (Color::Black, &game_config.black),
        ];
        for (color, username) in seats {
            if let Some(username) = username {
                store.claim_seat(id, color, username).map_err(to_io)?;
            }
        }
    }
    Ok(store)
}

/// Read commands line by line until the peer disconnects.
/// Outbound messages are written by a dedicated thread draining the connection's channel.
fn serve_connection(dispatcher: &Arc<Dispatcher>, pool: &ThreadPool, stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| String::from("unknown peer"), |addr| addr.to_string());
    info!("{peer} connected");

    let writer_stream = match stream.try_clone() {
        Ok(writer_stream) => writer_stream,
        Err(err) => {
            warn!("{peer}: could not clone stream: {err}");
            return;
        }
    };
    let (transport, outbox) = ChannelTransport::new();
    let writer = thread::Builder::new()
        .name(format!("writer {peer}"))
        .spawn(move || write_lines(writer_stream, outbox));
    let writer = match writer {
        Ok(writer) => writer,
        Err(err) => {
            warn!("{peer}: could not spawn writer: {err}");
            return;
        }
    };

    let handle: Handle = transport.clone();
    for line in BufReader::new(stream).lines() {
        match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                if let Err(err) = dispatch_line(dispatcher, pool, &handle, line) {
                    warn!("{peer}: {err}");
                    break;
                }
            }
            Err(err) => {
                debug!("{peer}: read failed: {err}");
                break;
            }
        }
    }

    transport.close();
    let evicted = dispatcher.registry().evict_closed();
    match writer.join() {
        Ok(Err(err)) => debug!("{peer}: write failed: {err}"),
        Err(_) => warn!("{peer}: writer panicked"),
        Ok(Ok(())) => (),
    }
    info!("{peer} disconnected, {evicted} registration(s) dropped");
}

/// Run one command on the pool and wait for it to finish, so commands of a
/// connection are handled in the order they arrived.
fn dispatch_line(
    dispatcher: &Arc<Dispatcher>,
    pool: &ThreadPool,
    origin: &Handle,
    line: String,
) -> error::Result<()> {
    let (done_tx, done_rx) = mpsc::channel();
    let dispatcher = Arc::clone(dispatcher);
    let origin = Arc::clone(origin);
    pool.run(move || {
        dispatcher.handle(&origin, &line);
        let _ = done_tx.send(());
    })?;

    if done_rx.recv().is_err() {
        warn!("command job ended without completing");
    }
    Ok(())
}

fn write_lines(mut stream: TcpStream, outbox: Receiver<String>) -> io::Result<()> {
    for text in outbox {
        stream.write_all(text.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
    }
    Ok(())
}
