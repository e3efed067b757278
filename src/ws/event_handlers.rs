//! WebSocket Event Handlers - Logica degli eventi del canale real-time
//!
//! Qui vivono le quattro operazioni del protocollo:
//! - authenticate: lega la connessione ad un utente della directory
//! - send_message: persiste e inoltra un messaggio diretto
//! - mark_messages_read: flip del read-state + receipt al mittente
//! - supervisor_allocated: notifica di assegnazione (solo admin)
//!
//! Tutti i fallimenti vengono riportati alla connessione che li ha causati;
//! nessuno abbatte il processo. Le azioni invocate prima dell'authenticate
//! vengono scartate senza feedback sul wire (comportamento documentato del
//! protocollo), con un warn lato server.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::AppState;
use crate::core::decode_jwt;
use crate::dtos::{
    AssignedPartyDTO, AuthenticateDTO, ClientEventDTO, CreateMessageDTO, MarkMessagesReadDTO,
    MessageDTO, SendMessageDTO, ServerEventDTO, SupervisorAllocatedDTO,
};
use crate::entities::UserRole;
use crate::ws::registry::InternalSignal;

/// Dispatch di un evento client già validato dal boundary
pub async fn process_event(state: &Arc<AppState>, connection_id: u64, event: ClientEventDTO) {
    match event {
        ClientEventDTO::Authenticate(claim) => {
            process_authenticate(state, connection_id, claim).await
        }
        ClientEventDTO::SendMessage(dto) => process_send_message(state, connection_id, dto).await,
        ClientEventDTO::MarkMessagesRead(dto) => {
            process_mark_read(state, connection_id, dto).await
        }
        ClientEventDTO::SupervisorAllocated(dto) => {
            process_supervisor_allocated(state, connection_id, dto).await
        }
    }
}

/// Handler dell'identity claim
/// Operazioni:
/// 1. Validare il claim (email non vuota, token coerente se presente)
/// 2. Risolvere l'utente nella directory per email
/// 3. Legare la connessione a (user_id, role) e sottoscrivere il fan-out
/// 4. Confermare al client e spingere il conteggio non letti
///
/// Un claim rifiutato lascia la connessione non autenticata e riutilizzabile
/// per un retry. Un re-auth su un account diverso sgancia prima la vecchia
/// sottoscrizione.
#[instrument(skip(state, claim), fields(connection_id))]
pub async fn process_authenticate(
    state: &Arc<AppState>,
    connection_id: u64,
    claim: AuthenticateDTO,
) {
    let email = claim.email.trim();
    if email.is_empty() {
        warn!("Authentication claim without email");
        state.connections.send_event(
            &connection_id,
            ServerEventDTO::AuthenticationError("Email is required".to_string()),
        );
        return;
    }

    // Il token è opzionale, ma se il client lo presenta deve essere valido
    // e coerente con l'email dichiarata
    if let Some(token) = &claim.token {
        match decode_jwt(token, &state.jwt_secret) {
            Ok(data) if data.claims.email.eq_ignore_ascii_case(email) => {}
            Ok(_) => {
                warn!("Token subject does not match claimed email");
                state.connections.send_event(
                    &connection_id,
                    ServerEventDTO::AuthenticationError(
                        "Token does not match the claimed identity".to_string(),
                    ),
                );
                return;
            }
            Err(_) => {
                state.connections.send_event(
                    &connection_id,
                    ServerEventDTO::AuthenticationError(
                        "Invalid authentication token".to_string(),
                    ),
                );
                return;
            }
        }
    }

    let user = match state.directory.find_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("No account matches the claimed email");
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::AuthenticationError(
                    "No account matches this email".to_string(),
                ),
            );
            return;
        }
        Err(e) => {
            warn!("Directory lookup failed: {}", e);
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Failed to look up user".to_string()),
            );
            return;
        }
    };

    // Binding atomico: ritorna l'eventuale identità precedente
    let previous = match state.connections.bind(&connection_id, user.user_id, user.role) {
        Some(previous) => previous,
        None => return, // connessione chiusa nel frattempo
    };

    match previous {
        Some((old_user_id, _)) if old_user_id != user.user_id => {
            // account switch sulla stessa connessione
            state
                .connections
                .send_signal(&connection_id, InternalSignal::Unbind(old_user_id));
            state
                .connections
                .send_signal(&connection_id, InternalSignal::Bind(user.user_id));
        }
        Some(_) => {
            // re-auth sullo stesso account, sottoscrizione già attiva
        }
        None => {
            state
                .connections
                .send_signal(&connection_id, InternalSignal::Bind(user.user_id));
        }
    }

    info!(user_id = user.user_id, role = ?user.role, "Connection authenticated");
    state.connections.send_event(
        &connection_id,
        ServerEventDTO::Authenticated {
            success: true,
            user_id: user.user_id,
            role: user.role,
        },
    );

    // Push di cortesia, non è una garanzia di consegna: se lo store non
    // risponde il client recupererà il conteggio via REST
    match state.messages.count_unread(user.user_id).await {
        Ok(count) => {
            state
                .connections
                .send_event(&connection_id, ServerEventDTO::UnreadCount { count });
        }
        Err(e) => warn!("Failed to count unread messages: {}", e),
    }
}

/// Handler di invio messaggio
/// Operazioni:
/// 1. Verificare che la connessione sia autenticata (altrimenti drop silenzioso)
/// 2. Validare contenuto e destinatario
/// 3. Persistere il messaggio nello store
/// 4. Fan-out alle connessioni vive del destinatario + ack al mittente
///
/// Se la persistenza fallisce il fan-out viene saltato del tutto: mai
/// consegnare un messaggio che non esiste nello store.
#[instrument(skip(state, dto), fields(connection_id))]
pub async fn process_send_message(state: &Arc<AppState>, connection_id: u64, dto: SendMessageDTO) {
    let Some((sender_id, _)) = state.connections.bound_identity(&connection_id) else {
        warn!("Ignoring send_message from unauthenticated connection");
        return;
    };

    let create = CreateMessageDTO {
        sender_id,
        recipient_id: dto.to_user_id,
        content: dto.message,
        message_type: dto.message_type.unwrap_or_default(),
        created_at: Utc::now(),
    };

    if let Err(e) = create.validate() {
        state.connections.send_event(
            &connection_id,
            ServerEventDTO::Error(format!("Validation error: {}", e)),
        );
        return;
    }

    // Il destinatario deve esistere nella directory: i messaggi referenziano
    // sempre due utenti validi
    match state.directory.find_by_id(create.recipient_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Recipient does not exist".to_string()),
            );
            return;
        }
        Err(e) => {
            warn!("Recipient lookup failed: {}", e);
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Failed to look up recipient".to_string()),
            );
            return;
        }
    }

    let message = match state.messages.insert(&create).await {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to persist message: {}", e);
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Failed to save message".to_string()),
            );
            return;
        }
    };

    let record = MessageDTO::from(message);
    let message_id = record.message_id;
    let recipient_id = record.recipient_id;

    // Destinatario offline: il record resta nello store e verrà osservato
    // alla prossima authenticate/fetch, nessun errore
    let reached = state
        .user_channels
        .send(&recipient_id, Arc::new(ServerEventDTO::ReceiveMessage(record)));
    info!(message_id, recipient_id, reached, "Message relayed");

    state.connections.send_event(
        &connection_id,
        ServerEventDTO::MessageSent {
            success: true,
            message_id,
        },
    );
}

/// Handler del mark-as-read in blocco
/// Operazioni:
/// 1. Verificare che la connessione sia autenticata (altrimenti drop silenzioso)
/// 2. Alzare il flag su tutti i messaggi non letti dal mittente indicato
/// 3. Ack al lettore + read receipt alle connessioni vive del mittente
///
/// L'operazione è idempotente: una seconda invocazione non cambia lo stato
/// persistito ma emette comunque gli stessi eventi.
#[instrument(skip(state, dto), fields(connection_id))]
pub async fn process_mark_read(state: &Arc<AppState>, connection_id: u64, dto: MarkMessagesReadDTO) {
    let Some((reader_id, _)) = state.connections.bound_identity(&connection_id) else {
        warn!("Ignoring mark_messages_read from unauthenticated connection");
        return;
    };

    let updated = match state.messages.mark_read(dto.from_user_id, reader_id).await {
        Ok(updated) => updated,
        Err(e) => {
            warn!("Failed to update read state: {}", e);
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Failed to update read state".to_string()),
            );
            return;
        }
    };

    info!(from_user_id = dto.from_user_id, reader_id, updated, "Messages marked read");

    state.connections.send_event(
        &connection_id,
        ServerEventDTO::MessagesMarkedRead { success: true },
    );

    // Read receipt per l'interfaccia del mittente originale
    state.user_channels.send(
        &dto.from_user_id,
        Arc::new(ServerEventDTO::MessageStatusUpdate {
            to_user_id: reader_id,
            read: true,
        }),
    );
}

/// Handler della notifica di allocazione supervisor
/// Operazioni:
/// 1. Verificare autenticazione (drop silenzioso) e ruolo admin (errore esplicito)
/// 2. Risolvere cliente e supervisor nella directory
/// 3. Notificare entrambe le parti sulle connessioni vive + ack all'admin
///
/// Gli eventi di presenza sono effimeri: una parte offline viene saltata,
/// nessuna coda durevole (asimmetria voluta rispetto ai messaggi).
#[instrument(skip(state, dto), fields(connection_id))]
pub async fn process_supervisor_allocated(
    state: &Arc<AppState>,
    connection_id: u64,
    dto: SupervisorAllocatedDTO,
) {
    let Some((_, role)) = state.connections.bound_identity(&connection_id) else {
        warn!("Ignoring supervisor_allocated from unauthenticated connection");
        return;
    };

    if role != UserRole::Admin {
        warn!(?role, "Supervisor allocation attempted by non-admin");
        state.connections.send_event(
            &connection_id,
            ServerEventDTO::Error("Only admins can allocate supervisors".to_string()),
        );
        return;
    }

    let (client, supervisor) = match (
        state.directory.find_by_id(dto.client_id).await,
        state.directory.find_by_id(dto.supervisor_id).await,
    ) {
        (Ok(Some(client)), Ok(Some(supervisor))) => (client, supervisor),
        (Ok(None), _) | (_, Ok(None)) => {
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Client or supervisor does not exist".to_string()),
            );
            return;
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Directory lookup failed: {}", e);
            state.connections.send_event(
                &connection_id,
                ServerEventDTO::Error("Failed to look up users".to_string()),
            );
            return;
        }
    };

    // Al cliente: chi è il suo supervisor
    state.user_channels.send(
        &client.user_id,
        Arc::new(ServerEventDTO::SupervisorAssigned(AssignedPartyDTO {
            user_id: supervisor.user_id,
            name: supervisor.name.clone(),
            email: supervisor.email.clone(),
            package: None,
        })),
    );

    // Al supervisor: chi è il cliente, pacchetto incluso
    state.user_channels.send(
        &supervisor.user_id,
        Arc::new(ServerEventDTO::ClientAssigned(AssignedPartyDTO {
            user_id: client.user_id,
            name: client.name.clone(),
            email: client.email.clone(),
            package: client.package.clone(),
        })),
    );

    info!(
        client_id = client.user_id,
        supervisor_id = supervisor.user_id,
        "Supervisor allocation notified"
    );

    state.connections.send_event(
        &connection_id,
        ServerEventDTO::AllocationSuccess { success: true },
    );
}
