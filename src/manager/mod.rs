//! # Transfer Process Manager
//!
//! The state-machine driver at the core of the connector. A single worker
//! polls the store state by state, dispatches the handler for each state,
//! and applies the resulting transitions. Handlers that reach out to
//! external systems (provisioning, deprovisioning, remote dispatch) start
//! the work on a spawned task and complete the transition from the
//! completion callback by re-reading the process from the store, so the
//! worker never blocks on external futures.
//!
//! State dispatch order is fixed so one tick can carry a newly created
//! process as far as `Requesting` before yielding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::{CommandQueue, CommandRunner};
use crate::dispatch::{MessageContext, RemoteMessageDispatcherRegistry};
use crate::error::{Result, TransferError};
use crate::flow::DataFlowManager;
use crate::logging::log_transfer_transition;
use crate::observe::TransferProcessObservable;
use crate::provision::{
    DeprovisionResponse, ProvisionManager, ProvisionResponse, ResourceManifestGenerator,
};
use crate::retry::WaitStrategy;
use crate::state_machine::{TransferProcessState, ACTIVE_STATES};
use crate::status::StatusCheckerRegistry;
use crate::store::TransferProcessStore;
use crate::types::{DataRequest, TransferProcess, TransferProcessType, TypeManager};

/// Shared collaborators of the worker and its completion callbacks
struct ManagerContext {
    store: Arc<dyn TransferProcessStore>,
    provision_manager: Arc<dyn ProvisionManager>,
    data_flow_manager: Arc<DataFlowManager>,
    dispatcher_registry: Arc<RemoteMessageDispatcherRegistry>,
    manifest_generator: Arc<dyn ResourceManifestGenerator>,
    status_checker_registry: Arc<StatusCheckerRegistry>,
    observable: Arc<TransferProcessObservable>,
    command_queue: Arc<CommandQueue>,
    command_runner: Arc<CommandRunner>,
    type_manager: TypeManager,
    batch_size: usize,
    running: AtomicBool,
    shutdown: Notify,
}

pub struct TransferProcessManager {
    ctx: Arc<ManagerContext>,
    wait_strategy: Mutex<Option<Box<dyn WaitStrategy>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TransferProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferProcessManager").finish()
    }
}

impl TransferProcessManager {
    pub fn builder() -> TransferProcessManagerBuilder {
        TransferProcessManagerBuilder::default()
    }

    /// Initiate a consumer-side transfer for the given request.
    ///
    /// Idempotent per transfer id: a repeated delivery of the same request
    /// returns the id of the process already backing it.
    pub async fn initiate_consumer_request(&self, data_request: DataRequest) -> Result<String> {
        self.initiate_request(TransferProcessType::Consumer, data_request)
            .await
    }

    /// Provider-side counterpart of [`initiate_consumer_request`]
    ///
    /// [`initiate_consumer_request`]: Self::initiate_consumer_request
    pub async fn initiate_provider_request(&self, data_request: DataRequest) -> Result<String> {
        self.initiate_request(TransferProcessType::Provider, data_request)
            .await
    }

    async fn initiate_request(
        &self,
        process_type: TransferProcessType,
        data_request: DataRequest,
    ) -> Result<String> {
        let existing = self
            .ctx
            .store
            .process_id_for_transfer_id(&data_request.id)
            .await?;
        if let Some(process_id) = existing {
            info!(
                transfer_id = %data_request.id,
                process_id = %process_id,
                "transfer already initiated"
            );
            return Ok(process_id);
        }

        let process = TransferProcess::builder()
            .id(Uuid::new_v4().to_string())
            .process_type(process_type)
            .data_request(data_request)
            .build()?;
        let process_id = process.id().to_string();
        self.ctx.store.create(process).await?;
        info!(
            process_id = %process_id,
            process_type = %process_type,
            "transfer process created"
        );
        Ok(process_id)
    }

    /// Launch the worker. The manager can be started once.
    pub async fn start(&self) -> Result<()> {
        let wait_strategy = self.wait_strategy.lock().await.take().ok_or_else(|| {
            TransferError::ConfigurationError(
                "transfer process manager can only be started once".to_string(),
            )
        })?;

        self.ctx.running.store(true, Ordering::Release);
        let worker = Worker {
            ctx: Arc::clone(&self.ctx),
            wait_strategy,
        };
        *self.worker.lock().await = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Signal shutdown and wait for the current tick to complete. In-flight
    /// async work is not cancelled; the next startup re-observes whatever
    /// state the store reports.
    pub async fn stop(&self) {
        self.ctx.running.store(false, Ordering::Release);
        self.ctx.shutdown.notify_one();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(error) = handle.await {
                error!(%error, "transfer manager worker terminated abnormally");
            }
        }
    }
}

struct Worker {
    ctx: Arc<ManagerContext>,
    wait_strategy: Box<dyn WaitStrategy>,
}

impl Worker {
    async fn run(mut self) {
        info!("transfer process manager worker started");
        while self.ctx.running.load(Ordering::Acquire) {
            let advanced = tick(&self.ctx).await;
            if advanced > 0 {
                self.wait_strategy.success();
            }

            let wait = Duration::from_millis(self.wait_strategy.wait_for_millis());
            if !self.ctx.running.load(Ordering::Acquire) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.ctx.shutdown.notified() => break,
            }
        }
        info!("transfer process manager worker stopped");
    }
}

/// One scheduler pass: drain commands, then visit every active state.
/// Returns how many processes were advanced or handed to async work.
async fn tick(ctx: &Arc<ManagerContext>) -> usize {
    let mut advanced = drain_commands(ctx).await;
    for state in ACTIVE_STATES {
        advanced += process_state(ctx, state).await;
    }
    advanced
}

async fn drain_commands(ctx: &Arc<ManagerContext>) -> usize {
    let commands = ctx.command_queue.dequeue(ctx.batch_size);
    let mut applied = 0;
    for command in commands {
        match ctx.command_runner.run(&command).await {
            Ok(()) => applied += 1,
            Err(error) => {
                warn!(command = ?command, %error, "transfer process command failed");
            }
        }
    }
    applied
}

async fn process_state(ctx: &Arc<ManagerContext>, state: TransferProcessState) -> usize {
    let batch = match ctx.store.next_for_state(state, ctx.batch_size).await {
        Ok(batch) => batch,
        Err(error) => {
            error!(%state, %error, "failed to read state batch, skipping state for this tick");
            return 0;
        }
    };

    let mut advanced = 0;
    for process in batch {
        if process.state() != state {
            // stores without leasing may hand back already-advanced rows
            debug!(
                process_id = %process.id(),
                expected = %state,
                actual = %process.state(),
                "skipping stale process"
            );
            continue;
        }
        let handled = match state {
            TransferProcessState::Initial => handle_initial(ctx, process).await,
            TransferProcessState::Provisioning => handle_provisioning(ctx, process),
            TransferProcessState::Provisioned => handle_provisioned(ctx, process).await,
            TransferProcessState::Requesting => handle_requesting(ctx, process),
            TransferProcessState::Requested => handle_requested(ctx, process).await,
            TransferProcessState::InProgress | TransferProcessState::Streaming => {
                handle_check_complete(ctx, process).await
            }
            TransferProcessState::Deprovisioning => handle_deprovisioning(ctx, process),
            TransferProcessState::Deprovisioned => handle_deprovisioned(ctx, process).await,
            other => {
                error!(state = %other, "no handler registered for state");
                false
            }
        };
        if handled {
            advanced += 1;
        }
    }
    advanced
}

/// Persist a transition and notify listeners. Returns false when the store
/// rejected the update; the next tick retries from the persisted state.
async fn update_and_notify(
    ctx: &ManagerContext,
    process: TransferProcess,
    from: TransferProcessState,
) -> bool {
    match ctx.store.update(process.clone()).await {
        Ok(()) => {
            log_transfer_transition(process.id(), from, process.state(), process.error_detail());
            ctx.observable.invoke_for_each(&process);
            true
        }
        Err(error) => {
            error!(
                process_id = %process.id(),
                %error,
                "failed to persist transfer process update"
            );
            false
        }
    }
}

async fn refetch(ctx: &ManagerContext, process_id: &str) -> Option<TransferProcess> {
    match ctx.store.find(process_id).await {
        Ok(Some(process)) => Some(process),
        Ok(None) => {
            error!(process_id, "transfer process disappeared from store");
            None
        }
        Err(error) => {
            error!(process_id, %error, "failed to re-read transfer process");
            None
        }
    }
}

/// Move a process to the error state from an async completion callback
async fn transition_to_error(ctx: &ManagerContext, process_id: &str, detail: String) {
    let Some(mut process) = refetch(ctx, process_id).await else {
        return;
    };
    let from = process.state();
    if process.transition_error(detail.as_str()).is_err() {
        debug!(process_id, "process already terminal, dropping error transition");
        return;
    }
    warn!(process_id, detail = %detail, "transfer process failed");
    update_and_notify(ctx, process, from).await;
}

/// `Initial`: generate and assign the manifest, then head for provisioning.
/// An empty manifest skips straight to `Provisioned`.
async fn handle_initial(ctx: &Arc<ManagerContext>, mut process: TransferProcess) -> bool {
    let from = process.state();
    let manifest = match ctx.manifest_generator.generate_resource_manifest(&process) {
        Ok(manifest) => manifest,
        Err(error) => {
            warn!(
                process_id = %process.id(),
                %error,
                "manifest generation failed, retrying next tick"
            );
            return false;
        }
    };

    let empty = manifest.is_empty();
    process.set_resource_manifest(manifest);
    let transitioned = if empty {
        process.transition_provisioned()
    } else {
        process.transition_provisioning()
    };
    if let Err(error) = transitioned {
        error!(process_id = %process.id(), %error, "skipping initial process");
        return false;
    }
    update_and_notify(ctx, process, from).await
}

/// `Provisioning`: hand the manifest to the provision manager on a spawned
/// task; the callback attaches the resources and completes the transition.
fn handle_provisioning(ctx: &Arc<ManagerContext>, process: TransferProcess) -> bool {
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let process_id = process.id().to_string();
        match ctx.provision_manager.provision(&process).await {
            Ok(responses) => on_provision_complete(&ctx, &process_id, responses).await,
            Err(error) => {
                transition_to_error(&ctx, &process_id, format!("provisioning failed: {error}"))
                    .await
            }
        }
    });
    true
}

async fn on_provision_complete(
    ctx: &ManagerContext,
    process_id: &str,
    responses: Vec<ProvisionResponse>,
) {
    let Some(mut process) = refetch(ctx, process_id).await else {
        return;
    };
    let from = process.state();
    for response in responses {
        if response.secret_token.is_some() {
            debug!(
                process_id,
                resource_id = %response.resource.id(),
                "provision response carried a secret token"
            );
        }
        process.add_provisioned_resource(response.resource);
    }
    if let Err(error) = process.transition_provisioned() {
        debug!(process_id, %error, "dropping provisioned transition");
        return;
    }
    update_and_notify(ctx, process, from).await;
}

/// `Provisioned`: consumers move on to dispatching the request, providers
/// open the data flow and go straight to `InProgress`.
async fn handle_provisioned(ctx: &Arc<ManagerContext>, mut process: TransferProcess) -> bool {
    let from = process.state();
    match process.process_type() {
        TransferProcessType::Consumer => {
            if let Err(error) = process.transition_requesting() {
                error!(process_id = %process.id(), %error, "skipping provisioned process");
                return false;
            }
            update_and_notify(ctx, process, from).await
        }
        TransferProcessType::Provider => match ctx.data_flow_manager.initiate(&process).await {
            Ok(response) => {
                debug!(
                    process_id = %process.id(),
                    endpoint_ref = %response.endpoint_ref,
                    "data flow initiated"
                );
                if let Err(error) = process.transition_in_progress() {
                    error!(process_id = %process.id(), %error, "skipping provisioned process");
                    return false;
                }
                update_and_notify(ctx, process, from).await
            }
            Err(error) => {
                let detail = format!("data flow initiation failed: {error}");
                if process.transition_error(detail.as_str()).is_err() {
                    return false;
                }
                warn!(process_id = %process.id(), detail = %detail, "transfer process failed");
                update_and_notify(ctx, process, from).await
            }
        },
    }
}

/// `Requesting`: dispatch the data request to the other connector. On ack
/// the callback records `Requested` and, when nothing else advanced the
/// process in between, continues straight into the running state. A failed
/// dispatch leaves the process in `Requesting` for a later retry.
fn handle_requesting(ctx: &Arc<ManagerContext>, process: TransferProcess) -> bool {
    let payload = match ctx.type_manager.write_value(process.data_request()) {
        Ok(payload) => payload,
        Err(error) => {
            error!(process_id = %process.id(), %error, "failed to serialize data request");
            return false;
        }
    };

    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let process_id = process.id().to_string();
        let protocol = process.data_request().protocol.clone();
        let is_finite = process.data_request().transfer_type.is_finite;
        let context = MessageContext::new(process_id.clone());
        match ctx.dispatcher_registry.send(&protocol, payload, &context).await {
            Ok(_) => on_request_ack(&ctx, &process_id, is_finite).await,
            Err(error) => warn!(
                process_id = %process_id,
                %error,
                "data request dispatch failed, staying in requesting for retry"
            ),
        }
    });
    true
}

async fn on_request_ack(ctx: &ManagerContext, process_id: &str, is_finite: bool) {
    let Some(mut process) = refetch(ctx, process_id).await else {
        return;
    };
    let from = process.state();
    if let Err(error) = process.transition_requested() {
        debug!(process_id, %error, "dropping requested transition");
        return;
    }
    if !update_and_notify(ctx, process, from).await {
        return;
    }

    let Some(mut process) = refetch(ctx, process_id).await else {
        return;
    };
    if process.state() != TransferProcessState::Requested {
        return;
    }
    let from = process.state();
    let transitioned = if is_finite {
        process.transition_in_progress()
    } else {
        process.transition_streaming()
    };
    if transitioned.is_err() {
        return;
    }
    update_and_notify(ctx, process, from).await;
}

/// `Requested`: wait until a destination resource exists, then fork on the
/// transfer type.
async fn handle_requested(ctx: &Arc<ManagerContext>, mut process: TransferProcess) -> bool {
    if !process.provisioned_resources().has_destination() {
        return false;
    }
    let from = process.state();
    let transitioned = if process.data_request().transfer_type.is_finite {
        process.transition_in_progress()
    } else {
        process.transition_streaming()
    };
    if transitioned.is_err() {
        return false;
    }
    update_and_notify(ctx, process, from).await
}

/// `InProgress`/`Streaming`: run the status checkers and, once every
/// resource reports done, complete the transfer and continue the tear-down
/// immediately (`Completed` is not a polled state).
async fn handle_check_complete(ctx: &Arc<ManagerContext>, mut process: TransferProcess) -> bool {
    if !transfer_is_complete(ctx, &process) {
        return false;
    }

    let from = process.state();
    if process.transition_completed().is_err() {
        return false;
    }
    if !update_and_notify(ctx, process.clone(), from).await {
        return false;
    }

    let from = process.state();
    let transitioned = if process.data_request().managed_resources {
        process.transition_deprovisioning()
    } else {
        process.transition_deprovisioned()
    };
    if transitioned.is_ok() {
        update_and_notify(ctx, process, from).await;
    }
    true
}

fn transfer_is_complete(ctx: &ManagerContext, process: &TransferProcess) -> bool {
    let resources = process.provisioned_resources();
    if process.data_request().managed_resources {
        if resources.is_empty() {
            return false;
        }
        // every resource needs a checker and every checker must agree
        resources.resources().iter().all(|resource| {
            ctx.status_checker_registry
                .resolve(resource.resource_kind())
                .map(|checker| checker.is_complete(process, resource))
                .unwrap_or(false)
        })
    } else {
        if !resources.has_destination() {
            return false;
        }
        // unmanaged resources without a registered checker count as done
        resources.resources().iter().all(|resource| {
            ctx.status_checker_registry
                .resolve(resource.resource_kind())
                .map(|checker| checker.is_complete(process, resource))
                .unwrap_or(true)
        })
    }
}

/// `Deprovisioning`: release the provisioned resources asynchronously
fn handle_deprovisioning(ctx: &Arc<ManagerContext>, process: TransferProcess) -> bool {
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let process_id = process.id().to_string();
        match ctx.provision_manager.deprovision(&process).await {
            Ok(responses) => on_deprovision_complete(&ctx, &process_id, responses).await,
            Err(error) => {
                transition_to_error(&ctx, &process_id, format!("deprovisioning failed: {error}"))
                    .await
            }
        }
    });
    true
}

async fn on_deprovision_complete(
    ctx: &ManagerContext,
    process_id: &str,
    responses: Vec<DeprovisionResponse>,
) {
    let Some(mut process) = refetch(ctx, process_id).await else {
        return;
    };
    debug!(
        process_id,
        released = responses.len(),
        "deprovisioning completed"
    );
    let from = process.state();
    if let Err(error) = process.transition_deprovisioned() {
        debug!(process_id, %error, "dropping deprovisioned transition");
        return;
    }
    update_and_notify(ctx, process, from).await;
}

/// `Deprovisioned`: the process reached its end of life
async fn handle_deprovisioned(ctx: &Arc<ManagerContext>, mut process: TransferProcess) -> bool {
    let from = process.state();
    if let Err(error) = process.transition_ended() {
        error!(process_id = %process.id(), %error, "skipping deprovisioned process");
        return false;
    }
    update_and_notify(ctx, process, from).await
}

/// Builder wiring every collaborator of the manager; all are required and
/// `batch_size` must be positive.
#[derive(Default)]
pub struct TransferProcessManagerBuilder {
    store: Option<Arc<dyn TransferProcessStore>>,
    provision_manager: Option<Arc<dyn ProvisionManager>>,
    data_flow_manager: Option<Arc<DataFlowManager>>,
    dispatcher_registry: Option<Arc<RemoteMessageDispatcherRegistry>>,
    manifest_generator: Option<Arc<dyn ResourceManifestGenerator>>,
    status_checker_registry: Option<Arc<StatusCheckerRegistry>>,
    observable: Option<Arc<TransferProcessObservable>>,
    command_queue: Option<Arc<CommandQueue>>,
    command_runner: Option<Arc<CommandRunner>>,
    wait_strategy: Option<Box<dyn WaitStrategy>>,
    type_manager: Option<TypeManager>,
    batch_size: Option<usize>,
}

impl TransferProcessManagerBuilder {
    pub fn store(mut self, store: Arc<dyn TransferProcessStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn provision_manager(mut self, provision_manager: Arc<dyn ProvisionManager>) -> Self {
        self.provision_manager = Some(provision_manager);
        self
    }

    pub fn data_flow_manager(mut self, data_flow_manager: Arc<DataFlowManager>) -> Self {
        self.data_flow_manager = Some(data_flow_manager);
        self
    }

    pub fn dispatcher_registry(
        mut self,
        dispatcher_registry: Arc<RemoteMessageDispatcherRegistry>,
    ) -> Self {
        self.dispatcher_registry = Some(dispatcher_registry);
        self
    }

    pub fn manifest_generator(
        mut self,
        manifest_generator: Arc<dyn ResourceManifestGenerator>,
    ) -> Self {
        self.manifest_generator = Some(manifest_generator);
        self
    }

    pub fn status_checker_registry(mut self, registry: Arc<StatusCheckerRegistry>) -> Self {
        self.status_checker_registry = Some(registry);
        self
    }

    pub fn observable(mut self, observable: Arc<TransferProcessObservable>) -> Self {
        self.observable = Some(observable);
        self
    }

    pub fn command_queue(mut self, command_queue: Arc<CommandQueue>) -> Self {
        self.command_queue = Some(command_queue);
        self
    }

    pub fn command_runner(mut self, command_runner: Arc<CommandRunner>) -> Self {
        self.command_runner = Some(command_runner);
        self
    }

    pub fn wait_strategy(mut self, wait_strategy: Box<dyn WaitStrategy>) -> Self {
        self.wait_strategy = Some(wait_strategy);
        self
    }

    pub fn type_manager(mut self, type_manager: TypeManager) -> Self {
        self.type_manager = Some(type_manager);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn build(self) -> Result<TransferProcessManager> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| {
                TransferError::ConfigurationError(format!("{name} is required"))
            })
        }

        let batch_size = required(self.batch_size, "batch_size")?;
        if batch_size == 0 {
            return Err(TransferError::ConfigurationError(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        let ctx = ManagerContext {
            store: required(self.store, "store")?,
            provision_manager: required(self.provision_manager, "provision_manager")?,
            data_flow_manager: required(self.data_flow_manager, "data_flow_manager")?,
            dispatcher_registry: required(self.dispatcher_registry, "dispatcher_registry")?,
            manifest_generator: required(self.manifest_generator, "manifest_generator")?,
            status_checker_registry: required(
                self.status_checker_registry,
                "status_checker_registry",
            )?,
            observable: required(self.observable, "observable")?,
            command_queue: required(self.command_queue, "command_queue")?,
            command_runner: required(self.command_runner, "command_runner")?,
            type_manager: required(self.type_manager, "type_manager")?,
            batch_size,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        };

        Ok(TransferProcessManager {
            ctx: Arc::new(ctx),
            wait_strategy: Mutex::new(Some(required(self.wait_strategy, "wait_strategy")?)),
            worker: Mutex::new(None),
        })
    }
}
