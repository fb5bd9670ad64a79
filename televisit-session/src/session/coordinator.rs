use crate::controls::CallControls;
use crate::media::{CaptureError, DeviceProvider, LocalMedia, MediaCapture};
use crate::peer::{IceConfig, NegotiationError, PeerEvent, PeerLink};
use crate::session::command::SessionCommand;
use crate::session::navigator::{Destination, Navigator};
use crate::session::state::{SessionPhase, SessionState, SessionView};
use crate::store::{RoomEvent, RoomPatch, RoomStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use televisit_core::{CandidateDoc, Role, RoomDoc, RoomId, RoomStatus, SessionBlob, UserId};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("peer connection: {0}")]
    Peer(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_id: RoomId,
    pub self_id: UserId,
    pub role: Role,
    pub ice: IceConfig,
    /// How long peers get to observe `ended` before a revoked room's
    /// document is deleted.
    pub revoke_grace: Duration,
    /// Bound on waiting for a local signaling-state transition.
    pub signaling_timeout: Duration,
}

impl SessionConfig {
    pub fn new(room_id: RoomId, self_id: UserId, role: Role) -> Self {
        Self {
            room_id,
            self_id,
            role,
            ice: IceConfig::default(),
            revoke_grace: Duration::from_secs(2),
            signaling_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle the hosting page keeps while the room view is mounted.
/// Dropping it closes the command channel, which the session treats as
/// unmount: full teardown, no redirect.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) {
        let _ = self.commands.send(command).await;
    }

    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Resolves once the session task has fully torn down.
    pub async fn finished(&self) {
        self.commands.closed().await;
    }
}

/// The room session coordinator: drives the join sequence, the
/// offer/answer/ICE exchange relayed through the document store, and
/// the leave/revoke/termination transitions, all on one event loop.
pub struct RoomSession {
    config: SessionConfig,
    store: Arc<dyn RoomStore>,
    devices: Arc<dyn DeviceProvider>,
    navigator: Arc<dyn Navigator>,
    state: SessionState,
    peer: Option<PeerLink>,
    media: LocalMedia,
    controls: Option<CallControls>,
    command_rx: mpsc::Receiver<SessionCommand>,
    peer_tx: mpsc::Sender<PeerEvent>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    view: SessionView,
    view_tx: watch::Sender<SessionView>,
}

impl RoomSession {
    /// Spawn the session task and hand back its control surface.
    pub fn start(
        config: SessionConfig,
        store: Arc<dyn RoomStore>,
        devices: Arc<dyn DeviceProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (peer_tx, peer_rx) = mpsc::channel(256);
        let (view_tx, view_rx) = watch::channel(SessionView::default());

        let session = Self {
            config,
            store,
            devices,
            navigator,
            state: SessionState::default(),
            peer: None,
            media: LocalMedia::empty(),
            controls: None,
            command_rx,
            peer_tx,
            peer_rx,
            view: SessionView::default(),
            view_tx,
        };
        tokio::spawn(session.run());

        SessionHandle {
            commands: command_tx,
            view: view_rx,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.config.room_id, user = %self.config.self_id, "room session starting");

        let subscriptions = match self.join().await {
            Ok(Some(subs)) => subs,
            Ok(None) => {
                // Redirected away before becoming a participant.
                self.teardown().await;
                return;
            }
            Err(e) => {
                // No retry loop: the view stays in Connecting and the
                // user reloads the page.
                error!(room = %self.config.room_id, "join failed: {e}");
                self.teardown().await;
                return;
            }
        };

        self.event_loop(subscriptions).await;
        self.teardown().await;
        info!(room = %self.config.room_id, "room session finished");
    }

    /// The join sequence. Order matters; every conditional write is
    /// preceded by a fresh read because the store has no check-and-set.
    /// Returns the subscriptions on success, or `None` when the caller
    /// was redirected away (not an error).
    async fn join(
        &mut self,
    ) -> Result<Option<(mpsc::Receiver<RoomEvent>, mpsc::Receiver<CandidateDoc>)>, SessionError>
    {
        let room_id = self.config.room_id.clone();

        // 1. Terminal and existence gate.
        let Some(doc) = self.store.get(&room_id).await? else {
            self.redirect_away();
            return Ok(None);
        };
        if doc.is_terminal() {
            self.redirect_away();
            return Ok(None);
        }

        // 2. Authorization gate: an invited room admits only its patient.
        if !doc.admits(&self.config.self_id, self.config.role) {
            info!(room = %room_id, user = %self.config.self_id, "not authorized for this room");
            self.redirect_away();
            return Ok(None);
        }

        // 3. Media and peer connection.
        self.media = MediaCapture::new(self.devices.clone()).acquire().await?;
        self.controls = Some(CallControls::new(self.devices.clone(), self.media.clone()));
        self.recreate_peer().await?;

        // 4. Mark joined. Re-check the step-1 conditions immediately
        // before the write; a revoke may have raced the join.
        let Some(doc) = self.store.get(&room_id).await? else {
            self.redirect_away();
            return Ok(None);
        };
        if doc.is_terminal() || !doc.admits(&self.config.self_id, self.config.role) {
            self.redirect_away();
            return Ok(None);
        }
        if !doc.has_participant(&self.config.self_id) {
            let mut patch = RoomPatch {
                add_participant: Some(self.config.self_id.clone()),
                status: Some(RoomStatus::Active),
                ..Default::default()
            };
            if self.config.role == Role::Patient {
                patch.receiver_id = Some(self.config.self_id.clone());
            }
            self.store.apply(&room_id, patch).await?;
        }

        // 5. Negotiation role election.
        let Some(doc) = self.store.get(&room_id).await? else {
            self.redirect_away();
            return Ok(None);
        };
        if doc.is_terminal() {
            self.redirect_away();
            return Ok(None);
        }
        match (&doc.offer, &doc.answer) {
            (None, _) => self.try_become_initiator().await?,
            (Some(offer), None) => {
                let offer = offer.clone();
                self.run_responder(offer).await;
            }
            // Both halves already exist; any further negotiation need
            // arrives through the subscription.
            (Some(_), Some(_)) => {}
        }

        // 6. Subscribe to the document and the candidate sub-collection.
        let room_rx = self.store.watch_room(&room_id).await?;
        let cand_rx = self.store.watch_candidates(&room_id).await?;

        self.view.phase = SessionPhase::Active;
        self.view.waiting_for_peer = !doc.counterpart_present(self.config.role);
        self.refresh_control_view();
        self.publish();

        info!(room = %room_id, user = %self.config.self_id, initiator = self.state.initiator, "joined room");
        Ok(Some((room_rx, cand_rx)))
    }

    /// Offer path: only when no offer exists, the connection is stable
    /// and nothing local has been set yet. Re-reads the room
    /// immediately before the write; if an offer appeared in the gap,
    /// the initiator role is yielded and the subscription's late-offer
    /// path will answer it instead.
    async fn try_become_initiator(&mut self) -> Result<(), SessionError> {
        let peer = self.peer.as_ref().expect("peer exists after join step 3");
        if self.state.leaving
            || peer.signaling_state() != RTCSignalingState::Stable
            || peer.has_local_description().await
        {
            return Ok(());
        }

        let offer = peer.create_offer().await?;
        peer.wait_signaling(RTCSignalingState::HaveLocalOffer, self.config.signaling_timeout)
            .await?;

        match self.store.get(&self.config.room_id).await? {
            Some(doc) if doc.is_terminal() => {}
            Some(doc) => {
                if doc.offer.is_none() && !self.state.leaving {
                    let patch = RoomPatch {
                        offer: Some(offer),
                        status: Some(RoomStatus::Active),
                        ..Default::default()
                    };
                    self.store.apply(&self.config.room_id, patch).await?;
                    self.state.initiator = true;
                    info!(room = %self.config.room_id, "wrote offer as initiator");
                } else if let (Some(theirs), None) = (&doc.offer, &doc.answer) {
                    // Lost the election: last write wins on `offer`, and
                    // our orphaned local description would block the
                    // responder path, so start over on a fresh connection
                    // and answer the winning offer.
                    debug!(room = %self.config.room_id, "offer appeared while preparing ours; taking responder role");
                    let theirs = theirs.clone();
                    self.recreate_peer().await?;
                    self.run_responder(theirs).await;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Responder path with the single automated recovery: on a
    /// signaling-state mismatch the peer connection is recreated from
    /// scratch and the answer attempted once more.
    async fn run_responder(&mut self, offer: SessionBlob) {
        match self.try_answer(&offer).await {
            Ok(()) => {}
            Err(SessionError::Negotiation(e)) if e.is_state_mismatch() && !self.state.reset_done => {
                warn!(room = %self.config.room_id, "answer failed ({e}), recreating peer connection");
                self.state.reset_done = true;
                match self.recreate_peer().await {
                    Ok(()) => {
                        if let Err(e) = self.try_answer(&offer).await {
                            error!(room = %self.config.room_id, "answer failed after reset: {e}");
                        }
                    }
                    Err(e) => error!(room = %self.config.room_id, "peer reset failed: {e}"),
                }
            }
            Err(e) => error!(room = %self.config.room_id, "responder path failed: {e}"),
        }
    }

    async fn try_answer(&mut self, offer: &SessionBlob) -> Result<(), SessionError> {
        if self.state.leaving {
            return Ok(());
        }
        let peer = self.peer.as_ref().expect("peer exists while joined");
        peer.apply_remote_offer(offer).await?;
        peer.wait_signaling(
            RTCSignalingState::HaveRemoteOffer,
            self.config.signaling_timeout,
        )
        .await?;

        // Still a participant, still not leaving, room still alive.
        if !self.still_participant().await? {
            return Ok(());
        }
        let peer = self.peer.as_ref().expect("peer exists while joined");
        let answer = peer.create_answer().await?;
        peer.wait_signaling(RTCSignalingState::Stable, self.config.signaling_timeout)
            .await?;

        if !self.still_participant().await? {
            return Ok(());
        }
        let patch = RoomPatch {
            answer: Some(answer),
            status: Some(RoomStatus::Active),
            ..Default::default()
        };
        self.store.apply(&self.config.room_id, patch).await?;
        info!(room = %self.config.room_id, "wrote answer as responder");
        Ok(())
    }

    async fn still_participant(&self) -> Result<bool, SessionError> {
        if self.state.leaving {
            return Ok(false);
        }
        let doc = self.store.get(&self.config.room_id).await?;
        Ok(doc.is_some_and(|d| !d.is_terminal() && d.has_participant(&self.config.self_id)))
    }

    async fn recreate_peer(&mut self) -> Result<(), SessionError> {
        if let Some(old) = self.peer.take() {
            let _ = old.close().await;
        }
        let peer = PeerLink::connect(
            self.config.room_id.clone(),
            self.config.self_id.clone(),
            self.config.ice.clone(),
            &self.media,
            self.peer_tx.clone(),
        )
        .await?;
        self.peer = Some(peer);
        Ok(())
    }

    async fn event_loop(
        &mut self,
        (mut room_rx, mut cand_rx): (mpsc::Receiver<RoomEvent>, mpsc::Receiver<CandidateDoc>),
    ) {
        let mut candidates_open = true;
        loop {
            tokio::select! {
                event = room_rx.recv() => match event {
                    Some(RoomEvent::Snapshot(doc)) => {
                        if self.handle_room_update(doc).await {
                            break;
                        }
                    }
                    Some(RoomEvent::Removed) | None => {
                        info!(room = %self.config.room_id, "room document gone, terminating");
                        self.terminate_by_peer().await;
                        break;
                    }
                },
                candidate = cand_rx.recv(), if candidates_open => match candidate {
                    Some(doc) => self.handle_candidate(doc).await,
                    None => candidates_open = false,
                },
                event = self.peer_rx.recv() => {
                    if let Some(event) = event {
                        self.handle_peer_event(event).await;
                    }
                },
                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Leave) => {
                        self.leave().await;
                        break;
                    }
                    Some(SessionCommand::Revoke) => {
                        if self.config.role == Role::Doctor {
                            self.revoke().await;
                            break;
                        }
                        warn!(room = %self.config.room_id, "revoke ignored: not the doctor");
                    }
                    Some(SessionCommand::Control(op)) => self.handle_control(op).await,
                    // Handle dropped: the page unmounted. Tear down
                    // without navigating anywhere.
                    None => {
                        self.state.leaving = true;
                        break;
                    }
                },
            }
        }
    }

    /// Runs on every change of the room document for the lifetime of
    /// the join. Returns true when the session must end.
    async fn handle_room_update(&mut self, doc: RoomDoc) -> bool {
        if doc.is_terminal() {
            info!(room = %self.config.room_id, status = ?doc.status, "room terminated remotely");
            self.terminate_by_peer().await;
            return true;
        }

        // Waiting indicator: each role waits on its counterpart. When
        // the counterpart is absent the remote feed is cleared too.
        let waiting = !doc.counterpart_present(self.config.role);
        if waiting {
            self.view.remote_active = false;
        }
        self.view.waiting_for_peer = waiting;
        self.publish();

        if let (Some(offer), None) = (&doc.offer, &doc.answer) {
            if !self.state.initiator && self.responder_pristine().await {
                let offer = offer.clone();
                self.run_responder(offer).await;
            }
        }

        if let Some(answer) = &doc.answer {
            if self.state.initiator {
                let peer = self.peer.as_ref().expect("peer exists while joined");
                if peer.signaling_state() == RTCSignalingState::HaveLocalOffer
                    && !peer.has_remote_description().await
                {
                    if let Err(e) = peer.apply_remote_answer(answer).await {
                        warn!(room = %self.config.room_id, "failed to apply answer: {e}");
                    }
                }
            }
        }

        false
    }

    /// Whether the local side can still take the responder role: stable
    /// and nothing set in either direction.
    async fn responder_pristine(&self) -> bool {
        let Some(peer) = self.peer.as_ref() else {
            return false;
        };
        peer.signaling_state() == RTCSignalingState::Stable
            && !peer.has_local_description().await
            && !peer.has_remote_description().await
    }

    async fn handle_candidate(&mut self, doc: CandidateDoc) {
        // Drop self-originated echoes.
        if doc.from == self.config.self_id {
            return;
        }
        let Some(peer) = self.peer.as_ref() else {
            return;
        };
        // Stale or invalid candidates are expected around teardown.
        if let Err(e) = peer.add_remote_candidate(&doc).await {
            debug!(room = %self.config.room_id, "ignoring ICE candidate: {e}");
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::RemoteTrack { kind } => {
                info!(room = %self.config.room_id, ?kind, "remote track arrived");
                self.view.remote_active = true;
                self.publish();
            }
            PeerEvent::LocalCandidate(doc) => {
                if self.state.leaving {
                    return;
                }
                if let Err(e) = self.store.add_candidate(&self.config.room_id, doc).await {
                    warn!(room = %self.config.room_id, "failed to publish ICE candidate: {e}");
                }
            }
            PeerEvent::ConnectionState(state) => {
                debug!(room = %self.config.room_id, ?state, "peer connection state");
                if matches!(
                    state,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Disconnected
                ) {
                    warn!(room = %self.config.room_id, ?state, "media transport degraded");
                }
            }
        }
    }

    async fn handle_control(&mut self, op: crate::controls::ControlOp) {
        let (Some(peer), Some(controls)) = (self.peer.as_ref(), self.controls.as_mut()) else {
            return;
        };
        if let Err(e) = controls.apply(op, peer).await {
            warn!(room = %self.config.room_id, "control operation failed: {e}");
        }
        self.refresh_control_view();
        self.publish();
    }

    /// Explicit, user-initiated leave. The room stays joinable: an
    /// invited room reverts to pending, and a near-empty room gets its
    /// offer/answer deleted so the next join renegotiates cleanly.
    async fn leave(&mut self) {
        self.state.leaving = true;
        self.teardown().await;

        match self.store.get(&self.config.room_id).await {
            Ok(Some(doc)) => {
                let remaining = doc
                    .participants
                    .iter()
                    .filter(|p| **p != self.config.self_id)
                    .count();
                let mut patch = RoomPatch {
                    remove_participant: Some(self.config.self_id.clone()),
                    ..Default::default()
                };
                if doc.receiver_id.is_some() {
                    patch.status = Some(RoomStatus::Pending);
                }
                if remaining <= 1 {
                    patch.clear_offer = true;
                    patch.clear_answer = true;
                }
                if let Err(e) = self.store.apply(&self.config.room_id, patch).await {
                    warn!(room = %self.config.room_id, "leave update failed: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(room = %self.config.room_id, "leave read failed: {e}"),
        }

        self.redirect_away();
    }

    /// Doctor-side hard termination. The ended marker lands first so
    /// open subscriptions observe it, then the document is deleted
    /// after the grace delay on a detached task.
    async fn revoke(&mut self) {
        let patch = RoomPatch {
            status: Some(RoomStatus::Ended),
            revoked_by: Some(self.config.self_id.clone()),
            stamp_ended_at: true,
            ..Default::default()
        };
        if let Err(e) = self.store.apply(&self.config.room_id, patch).await {
            warn!(room = %self.config.room_id, "revoke update failed: {e}");
        }

        let store = self.store.clone();
        let room_id = self.config.room_id.clone();
        let grace = self.config.revoke_grace;
        tokio::spawn(async move {
            sleep(grace).await;
            if let Err(e) = store.delete(&room_id).await {
                warn!(room = %room_id, "revoked room delete failed: {e}");
            }
        });

        self.state.leaving = true;
        self.teardown().await;
        self.redirect_away();
    }

    /// Termination observed from the store (revoke by the other side,
    /// external cancellation, or document deletion).
    async fn terminate_by_peer(&mut self) {
        self.state.leaving = true;
        self.teardown().await;
        self.redirect_away();
    }

    /// Release the camera/microphone and close the connection. Runs on
    /// every exit path; idempotent.
    async fn teardown(&mut self) {
        if let Some(controls) = self.controls.as_mut() {
            controls.release();
        }
        if let Some(peer) = self.peer.take() {
            let _ = peer.close().await;
        }
        self.media.stop_all();
        self.view.remote_active = false;
        self.publish();
    }

    fn redirect_away(&mut self) {
        self.view.phase = SessionPhase::Ended;
        self.publish();
        self.navigator
            .redirect(Destination::for_role(self.config.role));
    }

    fn refresh_control_view(&mut self) {
        if let Some(controls) = self.controls.as_ref() {
            self.view.mic_on = controls.mic_on();
            self.view.camera_on = controls.camera_on();
            self.view.sharing_screen = controls.sharing_screen();
            self.view.pinned = controls.pinned().cloned();
            self.view.fullscreen = controls.fullscreen();
        }
    }

    fn publish(&self) {
        let _ = self.view_tx.send(self.view.clone());
    }
}
