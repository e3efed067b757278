//! Integration tests per il core real-time (handler-level)
//!
//! Questi test pilotano direttamente gli event handler con connessioni
//! simulate: un canale mpsc registrato nella ConnectionMap fa le veci del
//! write task, una subscribe diretta sul canale broadcast dell'utente fa
//! le veci delle sue connessioni vive. Lo storage è il backend in-memory,
//! quindi la suite gira senza database.

mod common;

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use common::*;
use sehra_server::core::AppState;
use sehra_server::dtos::{
    AuthenticateDTO, MarkMessagesReadDTO, SendMessageDTO, ServerEventDTO, SupervisorAllocatedDTO,
};
use sehra_server::entities::UserRole;
use sehra_server::ws::event_handlers::{
    process_authenticate, process_mark_read, process_send_message, process_supervisor_allocated,
};
use sehra_server::ws::registry::InternalSignal;

/// Registra una connessione simulata: il receiver restituito osserva i
/// segnali che il write task riceverebbe
fn open_connection(state: &Arc<AppState>) -> (u64, UnboundedReceiver<InternalSignal>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let connection_id = state.connections.register(tx);
    (connection_id, rx)
}

/// Prossimo evento wire diretto alla connessione, saltando i segnali di
/// sottoscrizione (Bind/Unbind)
fn next_direct_event(rx: &mut UnboundedReceiver<InternalSignal>) -> ServerEventDTO {
    loop {
        match rx.try_recv() {
            Ok(InternalSignal::Event(event)) => return event,
            Ok(_) => continue,
            Err(_) => panic!("Expected a direct event on the connection channel"),
        }
    }
}

fn assert_no_pending_signal(rx: &mut UnboundedReceiver<InternalSignal>) {
    assert!(
        rx.try_recv().is_err(),
        "Connection channel should be empty"
    );
}

/// Autentica una connessione simulata e scarta gli eventi di conferma
async fn authenticate_as(
    state: &Arc<AppState>,
    connection_id: u64,
    rx: &mut UnboundedReceiver<InternalSignal>,
    email: &str,
) {
    process_authenticate(
        state,
        connection_id,
        AuthenticateDTO {
            email: email.to_string(),
            token: None,
        },
    )
    .await;

    match next_direct_event(rx) {
        ServerEventDTO::Authenticated { success: true, .. } => {}
        other => panic!("Expected authenticated event, got {:?}", other),
    }
    match next_direct_event(rx) {
        ServerEventDTO::UnreadCount { .. } => {}
        other => panic!("Expected unread_count event, got {:?}", other),
    }
}

// ============================================================
// Authenticate: binding, errori, re-auth
// ============================================================

#[tokio::test]
async fn authenticate_binds_connection_and_pushes_unread_count() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, Some("gold")).await;

    let (connection_id, mut rx) = open_connection(&state);
    assert!(!state.connections.is_authenticated(&connection_id));

    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "priya@sehra.in".to_string(),
            token: None,
        },
    )
    .await;

    // Il segnale di sottoscrizione precede la conferma: quando il client
    // osserva authenticated, il fan-out è già attivo
    match rx.try_recv() {
        Ok(InternalSignal::Bind(user_id)) => assert_eq!(user_id, client.user_id),
        _ => panic!("Expected Bind signal before any event"),
    }
    match next_direct_event(&mut rx) {
        ServerEventDTO::Authenticated {
            success,
            user_id,
            role,
        } => {
            assert!(success);
            assert_eq!(user_id, client.user_id);
            assert_eq!(role, UserRole::Client);
        }
        other => panic!("Expected authenticated event, got {:?}", other),
    }
    match next_direct_event(&mut rx) {
        ServerEventDTO::UnreadCount { count } => assert_eq!(count, 0),
        other => panic!("Expected unread_count event, got {:?}", other),
    }

    assert!(state.connections.is_authenticated(&connection_id));
}

#[tokio::test]
async fn authenticate_unknown_email_leaves_connection_usable() {
    let state = create_test_state();
    let (connection_id, mut rx) = open_connection(&state);

    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "nobody@sehra.in".to_string(),
            token: None,
        },
    )
    .await;

    match next_direct_event(&mut rx) {
        ServerEventDTO::AuthenticationError(reason) => {
            assert!(reason.contains("No account"), "unexpected reason: {}", reason);
        }
        other => panic!("Expected authentication_error, got {:?}", other),
    }
    assert!(!state.connections.is_authenticated(&connection_id));

    // La connessione resta utilizzabile per un retry con il claim giusto
    seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;
    authenticate_as(&state, connection_id, &mut rx, "ravi@sehra.in").await;
    assert!(state.connections.is_authenticated(&connection_id));
}

#[tokio::test]
async fn authenticate_rejects_empty_email_and_bad_token() {
    let state = create_test_state();
    let user = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let (connection_id, mut rx) = open_connection(&state);

    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "   ".to_string(),
            token: None,
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut rx),
        ServerEventDTO::AuthenticationError(_)
    ));

    // Token firmato per un'altra identità
    let token = create_test_jwt(user.user_id, "someone-else@sehra.in");
    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "priya@sehra.in".to_string(),
            token: Some(token),
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut rx),
        ServerEventDTO::AuthenticationError(_)
    ));
    assert!(!state.connections.is_authenticated(&connection_id));

    // Token coerente con l'email dichiarata
    let token = create_test_jwt(user.user_id, "priya@sehra.in");
    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "priya@sehra.in".to_string(),
            token: Some(token),
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut rx),
        ServerEventDTO::Authenticated { success: true, .. }
    ));
}

#[tokio::test]
async fn reauthenticate_switches_account_on_same_connection() {
    let state = create_test_state();
    let first = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let second = seed_user(&state, "Asha", "asha@sehra.in", UserRole::Supervisor, None).await;

    let (connection_id, mut rx) = open_connection(&state);
    authenticate_as(&state, connection_id, &mut rx, "priya@sehra.in").await;
    assert_eq!(
        state.connections.bound_identity(&connection_id),
        Some((first.user_id, UserRole::Client))
    );

    process_authenticate(
        &state,
        connection_id,
        AuthenticateDTO {
            email: "asha@sehra.in".to_string(),
            token: None,
        },
    )
    .await;

    // Prima si sgancia la vecchia sottoscrizione, poi si attiva la nuova
    match rx.try_recv() {
        Ok(InternalSignal::Unbind(user_id)) => assert_eq!(user_id, first.user_id),
        _ => panic!("Expected Unbind of the previous account"),
    }
    match rx.try_recv() {
        Ok(InternalSignal::Bind(user_id)) => assert_eq!(user_id, second.user_id),
        _ => panic!("Expected Bind of the new account"),
    }
    assert_eq!(
        state.connections.bound_identity(&connection_id),
        Some((second.user_id, UserRole::Supervisor))
    );
}

// ============================================================
// Message relay: durabilità, fan-out, no-op da non autenticati
// ============================================================

#[tokio::test]
async fn send_message_is_durable_even_with_recipient_offline() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let vendor = seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    let (connection_id, mut rx) = open_connection(&state);
    authenticate_as(&state, connection_id, &mut rx, "priya@sehra.in").await;

    process_send_message(
        &state,
        connection_id,
        SendMessageDTO {
            to_user_id: vendor.user_id,
            message: "Hi".to_string(),
            message_type: None,
        },
    )
    .await;

    // Ack al mittente con l'id del record persistito
    let message_id = match next_direct_event(&mut rx) {
        ServerEventDTO::MessageSent {
            success: true,
            message_id,
        } => message_id,
        other => panic!("Expected message_sent ack, got {:?}", other),
    };

    // Il record esiste nello store anche se il destinatario è offline
    let conversation = state
        .messages
        .find_conversation(client.user_id, vendor.user_id)
        .await
        .unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].message_id, message_id);
    assert_eq!(conversation[0].content, "Hi");
    assert!(!conversation[0].read);
    assert_eq!(state.messages.count_unread(vendor.user_id).await.unwrap(), 1);

    // Nessuna connessione viva del vendor, nessun fan-out
    assert!(!state.user_channels.is_online(&vendor.user_id));
}

#[tokio::test]
async fn send_message_fans_out_to_every_live_connection() {
    let state = create_test_state();
    seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let vendor = seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    let (connection_id, mut rx) = open_connection(&state);
    authenticate_as(&state, connection_id, &mut rx, "priya@sehra.in").await;

    // Due tab del vendor: entrambe sottoscritte al suo canale
    let mut vendor_rx1 = state.user_channels.subscribe(&vendor.user_id);
    let mut vendor_rx2 = state.user_channels.subscribe(&vendor.user_id);

    process_send_message(
        &state,
        connection_id,
        SendMessageDTO {
            to_user_id: vendor.user_id,
            message: "Portfolio ready".to_string(),
            message_type: None,
        },
    )
    .await;

    let first = vendor_rx1.try_recv().expect("first tab should receive");
    let second = vendor_rx2.try_recv().expect("second tab should receive");

    let first_id = match &*first {
        ServerEventDTO::ReceiveMessage(record) => {
            assert_eq!(record.content, "Portfolio ready");
            assert!(!record.read);
            record.message_id
        }
        other => panic!("Expected receive_message, got {:?}", other),
    };
    let second_id = match &*second {
        ServerEventDTO::ReceiveMessage(record) => record.message_id,
        other => panic!("Expected receive_message, got {:?}", other),
    };
    assert_eq!(first_id, second_id, "both tabs see the same message id");
}

#[tokio::test]
async fn relay_preserves_per_pair_ordering() {
    let state = create_test_state();
    seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let vendor = seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    let (connection_id, mut rx) = open_connection(&state);
    authenticate_as(&state, connection_id, &mut rx, "priya@sehra.in").await;

    let mut vendor_rx = state.user_channels.subscribe(&vendor.user_id);

    for content in ["one", "two", "three"] {
        process_send_message(
            &state,
            connection_id,
            SendMessageDTO {
                to_user_id: vendor.user_id,
                message: content.to_string(),
                message_type: None,
            },
        )
        .await;
    }

    let mut seen = Vec::new();
    while let Ok(event) = vendor_rx.try_recv() {
        if let ServerEventDTO::ReceiveMessage(record) = &*event {
            seen.push(record.content.clone());
        }
    }
    assert_eq!(seen, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn unauthenticated_actions_are_dropped_without_side_effects() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let supervisor =
        seed_user(&state, "Asha", "asha@sehra.in", UserRole::Supervisor, None).await;

    let (connection_id, mut rx) = open_connection(&state);

    process_send_message(
        &state,
        connection_id,
        SendMessageDTO {
            to_user_id: client.user_id,
            message: "should be dropped".to_string(),
            message_type: None,
        },
    )
    .await;
    process_mark_read(
        &state,
        connection_id,
        MarkMessagesReadDTO {
            from_user_id: client.user_id,
        },
    )
    .await;
    process_supervisor_allocated(
        &state,
        connection_id,
        SupervisorAllocatedDTO {
            client_id: client.user_id,
            supervisor_id: supervisor.user_id,
        },
    )
    .await;

    // Nessuna mutazione dello store, nessun evento in uscita: il drop è silenzioso
    let conversation = state
        .messages
        .find_conversation(client.user_id, supervisor.user_id)
        .await
        .unwrap();
    assert!(conversation.is_empty());
    assert_eq!(state.messages.count_unread(client.user_id).await.unwrap(), 0);
    assert_no_pending_signal(&mut rx);
}

#[tokio::test]
async fn send_to_unknown_recipient_reports_error_without_insert() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;

    let (connection_id, mut rx) = open_connection(&state);
    authenticate_as(&state, connection_id, &mut rx, "priya@sehra.in").await;

    process_send_message(
        &state,
        connection_id,
        SendMessageDTO {
            to_user_id: 999,
            message: "into the void".to_string(),
            message_type: None,
        },
    )
    .await;

    assert!(matches!(
        next_direct_event(&mut rx),
        ServerEventDTO::Error(_)
    ));
    let conversation = state
        .messages
        .find_conversation(client.user_id, 999)
        .await
        .unwrap();
    assert!(conversation.is_empty());
}

// ============================================================
// Read-state: idempotenza e receipt al mittente
// ============================================================

#[tokio::test]
async fn mark_read_flips_state_once_and_notifies_sender() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let vendor = seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    // La cliente invia due messaggi al vendor
    let (client_conn, mut client_rx) = open_connection(&state);
    authenticate_as(&state, client_conn, &mut client_rx, "priya@sehra.in").await;
    for content in ["first", "second"] {
        process_send_message(
            &state,
            client_conn,
            SendMessageDTO {
                to_user_id: vendor.user_id,
                message: content.to_string(),
                message_type: None,
            },
        )
        .await;
        next_direct_event(&mut client_rx); // scarta l'ack
    }
    assert_eq!(state.messages.count_unread(vendor.user_id).await.unwrap(), 2);

    // Connessione viva della cliente, in attesa del read receipt
    let mut client_channel_rx = state.user_channels.subscribe(&client.user_id);

    let (vendor_conn, mut vendor_rx) = open_connection(&state);
    authenticate_as(&state, vendor_conn, &mut vendor_rx, "ravi@sehra.in").await;

    process_mark_read(
        &state,
        vendor_conn,
        MarkMessagesReadDTO {
            from_user_id: client.user_id,
        },
    )
    .await;

    assert!(matches!(
        next_direct_event(&mut vendor_rx),
        ServerEventDTO::MessagesMarkedRead { success: true }
    ));
    match &*client_channel_rx.try_recv().expect("sender should get a receipt") {
        ServerEventDTO::MessageStatusUpdate { to_user_id, read } => {
            assert_eq!(*to_user_id, vendor.user_id);
            assert!(read);
        }
        other => panic!("Expected message_status_update, got {:?}", other),
    }
    assert_eq!(state.messages.count_unread(vendor.user_id).await.unwrap(), 0);

    // Seconda invocazione: stato invariato ma stessi eventi emessi
    process_mark_read(
        &state,
        vendor_conn,
        MarkMessagesReadDTO {
            from_user_id: client.user_id,
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut vendor_rx),
        ServerEventDTO::MessagesMarkedRead { success: true }
    ));
    assert!(matches!(
        &*client_channel_rx.try_recv().expect("receipt emitted again"),
        ServerEventDTO::MessageStatusUpdate { .. }
    ));
    assert_eq!(state.messages.count_unread(vendor.user_id).await.unwrap(), 0);
}

// ============================================================
// Presence notifier: gate admin e notifiche alle due parti
// ============================================================

#[tokio::test]
async fn allocation_notifies_both_parties_when_live() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, Some("platinum")).await;
    let supervisor =
        seed_user(&state, "Asha", "asha@sehra.in", UserRole::Supervisor, None).await;
    seed_user(&state, "Admin", "admin@sehra.in", UserRole::Admin, None).await;

    let mut client_channel_rx = state.user_channels.subscribe(&client.user_id);
    let mut supervisor_channel_rx = state.user_channels.subscribe(&supervisor.user_id);

    let (admin_conn, mut admin_rx) = open_connection(&state);
    authenticate_as(&state, admin_conn, &mut admin_rx, "admin@sehra.in").await;

    process_supervisor_allocated(
        &state,
        admin_conn,
        SupervisorAllocatedDTO {
            client_id: client.user_id,
            supervisor_id: supervisor.user_id,
        },
    )
    .await;

    match &*client_channel_rx.try_recv().expect("client side notified") {
        ServerEventDTO::SupervisorAssigned(party) => {
            assert_eq!(party.user_id, supervisor.user_id);
            assert_eq!(party.name, "Asha");
            assert_eq!(party.email, "asha@sehra.in");
            assert!(party.package.is_none());
        }
        other => panic!("Expected supervisor_assigned, got {:?}", other),
    }
    match &*supervisor_channel_rx.try_recv().expect("supervisor side notified") {
        ServerEventDTO::ClientAssigned(party) => {
            assert_eq!(party.user_id, client.user_id);
            assert_eq!(party.name, "Priya");
            assert_eq!(party.package.as_deref(), Some("platinum"));
        }
        other => panic!("Expected client_assigned, got {:?}", other),
    }
    assert!(matches!(
        next_direct_event(&mut admin_rx),
        ServerEventDTO::AllocationSuccess { success: true }
    ));
}

#[tokio::test]
async fn allocation_from_non_admin_is_rejected() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let supervisor =
        seed_user(&state, "Asha", "asha@sehra.in", UserRole::Supervisor, None).await;
    seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    let mut client_channel_rx = state.user_channels.subscribe(&client.user_id);
    let mut supervisor_channel_rx = state.user_channels.subscribe(&supervisor.user_id);

    let (vendor_conn, mut vendor_rx) = open_connection(&state);
    authenticate_as(&state, vendor_conn, &mut vendor_rx, "ravi@sehra.in").await;

    process_supervisor_allocated(
        &state,
        vendor_conn,
        SupervisorAllocatedDTO {
            client_id: client.user_id,
            supervisor_id: supervisor.user_id,
        },
    )
    .await;

    // Errore di autorizzazione al chiamante, nessuna notifica alle parti
    assert!(matches!(
        next_direct_event(&mut vendor_rx),
        ServerEventDTO::Error(_)
    ));
    assert!(client_channel_rx.try_recv().is_err());
    assert!(supervisor_channel_rx.try_recv().is_err());
}

// ============================================================
// Scenario completo: destinatario offline, unread al rientro, receipt
// ============================================================

#[tokio::test]
async fn offline_recipient_sees_unread_on_next_authenticate() {
    let state = create_test_state();
    let client = seed_user(&state, "Priya", "priya@sehra.in", UserRole::Client, None).await;
    let vendor = seed_user(&state, "Ravi", "ravi@sehra.in", UserRole::Vendor, None).await;

    // La cliente autentica e scrive al vendor offline
    let (client_conn, mut client_rx) = open_connection(&state);
    authenticate_as(&state, client_conn, &mut client_rx, "priya@sehra.in").await;
    let mut client_channel_rx = state.user_channels.subscribe(&client.user_id);

    process_send_message(
        &state,
        client_conn,
        SendMessageDTO {
            to_user_id: vendor.user_id,
            message: "Hi".to_string(),
            message_type: None,
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut client_rx),
        ServerEventDTO::MessageSent { success: true, .. }
    ));

    // Il vendor si connette dopo: l'unread count riflette il messaggio
    let (vendor_conn, mut vendor_rx) = open_connection(&state);
    process_authenticate(
        &state,
        vendor_conn,
        AuthenticateDTO {
            email: "ravi@sehra.in".to_string(),
            token: None,
        },
    )
    .await;
    assert!(matches!(
        next_direct_event(&mut vendor_rx),
        ServerEventDTO::Authenticated { success: true, .. }
    ));
    match next_direct_event(&mut vendor_rx) {
        ServerEventDTO::UnreadCount { count } => assert_eq!(count, 1),
        other => panic!("Expected unread_count, got {:?}", other),
    }

    // Il vendor marca come letto: alla cliente arriva il receipt
    process_mark_read(
        &state,
        vendor_conn,
        MarkMessagesReadDTO {
            from_user_id: client.user_id,
        },
    )
    .await;
    match &*client_channel_rx.try_recv().expect("receipt for the sender") {
        ServerEventDTO::MessageStatusUpdate { to_user_id, read } => {
            assert_eq!(*to_user_id, vendor.user_id);
            assert!(read);
        }
        other => panic!("Expected message_status_update, got {:?}", other),
    }
}
