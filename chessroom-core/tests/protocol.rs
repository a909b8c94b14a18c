//! Dispatcher behavior as seen by connected clients.
//!
//! Every client is a `ChannelTransport`, its receiver collects what the server sent.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use chessroom_core::error::{self, ErrorKind};
use chessroom_core::protocol::GameId;
use chessroom_core::*;

struct Client {
    handle: Handle,
    inbox: Receiver<String>,
    token: String,
}

impl Client {
    /// Everything received since the last call.
    fn drain(&self) -> Vec<ServerMessage> {
        self.inbox
            .try_iter()
            .map(|text| text.parse().unwrap())
            .collect()
    }
}

struct Room {
    dispatcher: Dispatcher,
    store: Arc<MemorySessionStore>,
    auth: Arc<MemoryAuth>,
    id: GameId,
}

impl Room {
    /// A fresh game with alice as white and bob as black.
    fn new() -> Self {
        Self::with_game(Game::start_position())
    }

    fn with_game(game: Game) -> Self {
        let store = Arc::new(MemorySessionStore::new());
        let auth = Arc::new(MemoryAuth::new());
        let id = store.create_with_game("test room", game);
        store.claim_seat(id, Color::White, "alice").unwrap();
        store.claim_seat(id, Color::Black, "bob").unwrap();
        let dispatcher = Dispatcher::new(store.clone(), auth.clone());
        Self {
            dispatcher,
            store,
            auth,
            id,
        }
    }

    fn client(&self, username: &str) -> Client {
        let (transport, inbox) = ChannelTransport::new();
        Client {
            handle: transport,
            inbox,
            token: self.auth.issue(username),
        }
    }

    fn send(&self, client: &Client, command: UserGameCommand) {
        self.dispatcher.handle(&client.handle, &command.to_string());
    }

    fn connect(&self, client: &Client) {
        self.send(client, UserGameCommand::new_connect(&client.token, self.id));
    }

    fn play(&self, client: &Client, move_str: &str) {
        let move_ = move_str.parse().unwrap();
        self.send(client, UserGameCommand::new_make_move(&client.token, self.id, move_));
    }

    fn session(&self) -> Session {
        self.store.session(self.id).unwrap()
    }

    /// alice, bob and observer carol, all connected with empty inboxes.
    fn seated() -> (Self, Client, Client, Client) {
        Self::seated_with(Game::start_position())
    }

    fn seated_with(game: Game) -> (Self, Client, Client, Client) {
        let room = Self::with_game(game);
        let (alice, bob, carol) = (room.client("alice"), room.client("bob"), room.client("carol"));
        for client in [&alice, &bob, &carol] {
            room.connect(client);
        }
        for client in [&alice, &bob, &carol] {
            client.drain();
        }
        (room, alice, bob, carol)
    }
}

fn notification(text: &str) -> ServerMessage {
    ServerMessage::new_notification(text)
}

fn error_text(messages: &[ServerMessage]) -> &str {
    match messages {
        [ServerMessage::Error { error_message }] => error_message,
        other => panic!("expected a single error, got {other:?}"),
    }
}

#[test]
fn connect_loads_game_and_announces_role() {
    let room = Room::new();
    let (alice, bob, carol) = (room.client("alice"), room.client("bob"), room.client("carol"));

    room.connect(&alice);
    assert_eq!(
        alice.drain(),
        [ServerMessage::new_load_game(Game::start_position())]
    );

    room.connect(&bob);
    assert_eq!(bob.drain().len(), 1);
    assert_eq!(alice.drain(), [notification("bob joined as BLACK")]);

    room.connect(&carol);
    assert!(matches!(carol.drain().as_slice(), [ServerMessage::LoadGame { .. }]));
    assert_eq!(alice.drain(), [notification("carol joined as an observer")]);
    assert_eq!(bob.drain(), [notification("carol joined as an observer")]);

    assert_eq!(
        room.dispatcher.registry().members(room.id),
        ["alice", "bob", "carol"]
    );
}

#[test]
fn move_reaches_everyone_once() {
    let (room, alice, bob, carol) = Room::seated();

    room.play(&alice, "e2e4");

    let mut expected = Game::start_position();
    expected.apply_move("e2e4".parse().unwrap()).unwrap();
    let load = ServerMessage::new_load_game(expected.clone());
    let moved = notification("alice moved WHITE PAWN from e2 to e4");

    assert_eq!(alice.drain(), [load.clone()]);
    assert_eq!(bob.drain(), [load.clone(), moved.clone()]);
    assert_eq!(carol.drain(), [load, moved]);
    assert_eq!(room.session().game, expected);
}

#[test]
fn unknown_token_is_unauthorized() {
    let (room, alice, bob, _carol) = Room::seated();
    let (transport, inbox) = ChannelTransport::new();
    let stranger = Client {
        handle: transport,
        inbox,
        token: String::from("not-a-token"),
    };

    room.connect(&stranger);
    assert_eq!(error_text(&stranger.drain()), "Error: unauthorized");
    assert!(alice.drain().is_empty());
    assert!(bob.drain().is_empty());
    assert_eq!(room.dispatcher.registry().len(), 3);
}

#[test]
fn unknown_token_make_move_is_unauthorized() {
    let (room, alice, bob, carol) = Room::seated();
    let (transport, inbox) = ChannelTransport::new();
    let stranger = Client {
        handle: transport,
        inbox,
        token: String::from("not-a-token"),
    };

    room.play(&stranger, "e2e4");
    assert_eq!(error_text(&stranger.drain()), "Error: unauthorized");
    for client in [&alice, &bob, &carol] {
        assert!(client.drain().is_empty());
    }
    assert_eq!(room.session().game, Game::start_position());
}

#[test]
fn rejected_moves_reply_only_to_sender() {
    let (room, alice, bob, carol) = Room::seated();

    room.play(&carol, "e2e4");
    assert_eq!(
        error_text(&carol.drain()),
        "Error: invalid move - observers cannot make moves"
    );

    room.play(&alice, "e7e5");
    assert_eq!(
        error_text(&alice.drain()),
        "Error: invalid move - can only move your own pieces"
    );

    room.play(&bob, "e7e5");
    assert_eq!(
        error_text(&bob.drain()),
        "Error: invalid move - not BLACK's turn"
    );

    room.play(&alice, "e3e4");
    assert_eq!(
        error_text(&alice.drain()),
        "Error: invalid move - no piece at e3"
    );

    room.play(&alice, "e2e5");
    assert_eq!(
        error_text(&alice.drain()),
        "Error: invalid move - e2e5 is not legal"
    );

    assert!(alice.drain().is_empty());
    assert!(bob.drain().is_empty());
    assert!(carol.drain().is_empty());
    assert_eq!(room.session().game, Game::start_position());
}

#[test]
fn check_is_announced_to_all() {
    let (room, alice, bob, carol) = Room::seated();
    room.play(&alice, "e2e4");
    room.play(&bob, "f7f6");
    for client in [&alice, &bob, &carol] {
        client.drain();
    }

    room.play(&alice, "d1h5");
    let check = notification("BLACK is in check");
    assert_eq!(alice.drain().last(), Some(&check));
    assert_eq!(bob.drain().last(), Some(&check));
    assert_eq!(carol.drain().last(), Some(&check));
    assert!(!room.session().is_over());
}

#[test]
fn checkmate_ends_the_game() {
    let (room, alice, bob, carol) = Room::seated();
    let moves = [
        (&alice, "e2e4"),
        (&bob, "e7e5"),
        (&alice, "f1c4"),
        (&bob, "b8c6"),
        (&alice, "d1h5"),
        (&bob, "g8f6"),
    ];
    for (client, move_str) in moves {
        room.play(client, move_str);
    }
    for client in [&alice, &bob, &carol] {
        client.drain();
    }

    room.play(&alice, "h5f7");
    let bob_saw = bob.drain();
    assert_eq!(bob_saw.len(), 3);
    assert!(matches!(bob_saw[0], ServerMessage::LoadGame { .. }));
    assert_eq!(
        bob_saw[1],
        notification("alice moved WHITE QUEEN from h5 to f7 capturing BLACK PAWN")
    );
    assert_eq!(bob_saw[2], notification("BLACK is in checkmate - GAME OVER"));
    assert_eq!(alice.drain().len(), 2);
    assert_eq!(carol.drain(), bob_saw);

    let session = room.session();
    assert_eq!(
        session.outcome,
        Some(Outcome::Checkmate {
            winner: Color::White
        })
    );

    room.play(&bob, "e8e7");
    assert_eq!(
        error_text(&bob.drain()),
        "Error: invalid move - game is over"
    );
    assert_eq!(room.session().game, session.game);
}

#[test]
fn stalemate_ends_the_game() {
    let game = Game::from_fen("7k/8/6K1/8/8/8/8/5Q2 w - - 0 1").unwrap();
    let (room, alice, bob, carol) = Room::seated_with(game);

    room.play(&alice, "f1f7");
    let stalemate = notification("BLACK is in stalemate - GAME OVER");
    assert_eq!(alice.drain().last(), Some(&stalemate));
    let bob_saw = bob.drain();
    assert_eq!(bob_saw.len(), 3);
    assert_eq!(
        bob_saw[1],
        notification("alice moved WHITE QUEEN from f1 to f7")
    );
    assert_eq!(bob_saw[2], stalemate);
    assert_eq!(carol.drain(), bob_saw);
    assert_eq!(room.session().outcome, Some(Outcome::Stalemate));

    room.play(&bob, "h8h7");
    assert_eq!(
        error_text(&bob.drain()),
        "Error: invalid move - game is over"
    );
}

#[test]
fn leave_vacates_seat() {
    let (room, alice, bob, carol) = Room::seated();

    room.send(&bob, UserGameCommand::new_leave(&bob.token, room.id));
    let left = notification("bob has left the game");
    assert_eq!(alice.drain(), [left.clone()]);
    assert_eq!(carol.drain(), [left]);
    assert!(bob.drain().is_empty());

    let session = room.session();
    assert_eq!(session.seat(Color::Black), None);
    assert_eq!(session.seat(Color::White), Some("alice"));
    assert_eq!(room.dispatcher.registry().members(room.id), ["alice", "carol"]);

    // An observer leaving keeps both seats.
    room.send(&carol, UserGameCommand::new_leave(&carol.token, room.id));
    assert_eq!(alice.drain(), [notification("carol has left the game")]);
    assert_eq!(room.session().seat(Color::White), Some("alice"));
}

#[test]
fn resign_concludes_once() {
    let (room, alice, bob, carol) = Room::seated();

    room.send(&carol, UserGameCommand::new_resign(&carol.token, room.id));
    assert_eq!(
        error_text(&carol.drain()),
        "Error: invalid move - observers cannot resign"
    );

    room.send(&alice, UserGameCommand::new_resign(&alice.token, room.id));
    let resigned = notification("alice resigned - BLACK wins - GAME OVER");
    assert_eq!(alice.drain(), [resigned.clone()]);
    assert_eq!(bob.drain(), [resigned.clone()]);
    assert_eq!(carol.drain(), [resigned]);
    assert_eq!(
        room.session().outcome,
        Some(Outcome::Resignation {
            winner: Color::Black
        })
    );

    room.send(&bob, UserGameCommand::new_resign(&bob.token, room.id));
    assert_eq!(
        error_text(&bob.drain()),
        "Error: invalid move - game is over"
    );
    room.play(&alice, "e2e4");
    assert_eq!(
        error_text(&alice.drain()),
        "Error: invalid move - game is over"
    );
}

#[test]
fn malformed_and_unknown_games() {
    let room = Room::new();
    let alice = room.client("alice");

    room.dispatcher.handle(&alice.handle, "{not json");
    assert!(error_text(&alice.drain()).starts_with("Error: malformed command"));

    let no_move = format!(
        r#"{{"commandType":"MAKE_MOVE","authToken":"{}","gameID":{}}}"#,
        alice.token, room.id
    );
    room.dispatcher.handle(&alice.handle, &no_move);
    assert!(error_text(&alice.drain()).starts_with("Error: malformed command"));

    room.send(&alice, UserGameCommand::new_connect(&alice.token, 99));
    assert_eq!(error_text(&alice.drain()), "Error: game 99 not found");
    assert!(room.dispatcher.registry().is_empty());
}

/// Store whose reads always fail.
struct BrokenStore;

impl SessionStore for BrokenStore {
    fn session(&self, _id: GameId) -> error::Result<Session> {
        Err((ErrorKind::Internal, "disk on fire").into())
    }

    fn update_game(
        &self,
        _id: GameId,
        _game: Game,
        _outcome: Option<Outcome>,
    ) -> error::Result<()> {
        Err(ErrorKind::Internal.into())
    }

    fn vacate_seat(&self, _id: GameId, _color: Color) -> error::Result<()> {
        Err(ErrorKind::Internal.into())
    }

    fn conclude(&self, _id: GameId, _outcome: Outcome) -> error::Result<()> {
        Err(ErrorKind::Internal.into())
    }
}

#[test]
fn store_failures_do_not_leak_detail() {
    let auth = Arc::new(MemoryAuth::new());
    let token = auth.issue("alice");
    let dispatcher = Dispatcher::new(Arc::new(BrokenStore), auth);
    let (transport, inbox) = ChannelTransport::new();
    let handle: Handle = transport;

    dispatcher.handle(&handle, &UserGameCommand::new_connect(&token, 1).to_string());
    let replies: Vec<ServerMessage> = inbox.try_iter().map(|text| text.parse().unwrap()).collect();
    assert_eq!(error_text(&replies), "Error: internal server error");
}

/// Store that serves sessions but refuses every write.
struct ReadOnlyStore {
    inner: MemorySessionStore,
}

impl SessionStore for ReadOnlyStore {
    fn session(&self, id: GameId) -> error::Result<Session> {
        self.inner.session(id)
    }

    fn update_game(
        &self,
        _id: GameId,
        _game: Game,
        _outcome: Option<Outcome>,
    ) -> error::Result<()> {
        Err((ErrorKind::Internal, "read only").into())
    }

    fn vacate_seat(&self, _id: GameId, _color: Color) -> error::Result<()> {
        Err((ErrorKind::Internal, "read only").into())
    }

    fn conclude(&self, _id: GameId, _outcome: Outcome) -> error::Result<()> {
        Err((ErrorKind::Internal, "read only").into())
    }
}

#[test]
fn failed_writes_change_nothing() {
    let inner = MemorySessionStore::new();
    let mate_in_one = Game::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let id = inner.create_with_game("back rank", mate_in_one.clone());
    inner.claim_seat(id, Color::White, "alice").unwrap();
    inner.claim_seat(id, Color::Black, "bob").unwrap();
    let store = Arc::new(ReadOnlyStore { inner });

    let auth = Arc::new(MemoryAuth::new());
    let dispatcher = Dispatcher::new(store.clone(), auth.clone());
    let (alice_tx, alice_rx) = ChannelTransport::new();
    let (bob_tx, bob_rx) = ChannelTransport::new();
    let alice = Client {
        handle: alice_tx,
        inbox: alice_rx,
        token: auth.issue("alice"),
    };
    let bob = Client {
        handle: bob_tx,
        inbox: bob_rx,
        token: auth.issue("bob"),
    };
    for client in [&alice, &bob] {
        let connect = UserGameCommand::new_connect(&client.token, id);
        dispatcher.handle(&client.handle, &connect.to_string());
    }
    alice.drain();
    bob.drain();

    let mate = UserGameCommand::new_make_move(&alice.token, id, "a1a8".parse().unwrap());
    dispatcher.handle(&alice.handle, &mate.to_string());
    assert_eq!(error_text(&alice.drain()), "Error: internal server error");
    assert!(bob.drain().is_empty());

    let resign = UserGameCommand::new_resign(&bob.token, id);
    dispatcher.handle(&bob.handle, &resign.to_string());
    assert_eq!(error_text(&bob.drain()), "Error: internal server error");
    assert!(alice.drain().is_empty());

    let session = store.session(id).unwrap();
    assert_eq!(session.game, mate_in_one);
    assert_eq!(session.outcome, None);
}

#[test]
fn mate_stores_move_and_outcome_together() {
    let game = Game::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let (room, alice, _bob, _carol) = Room::seated_with(game);

    room.play(&alice, "a1a8");
    assert_eq!(
        alice.drain().last(),
        Some(&notification("BLACK is in checkmate - GAME OVER"))
    );
    let session = room.session();
    assert_eq!(*session.game.turn(), Color::Black);
    assert_eq!(
        session.outcome,
        Some(Outcome::Checkmate {
            winner: Color::White
        })
    );
}
