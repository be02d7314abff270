//! Shared fixtures for the scheduler integration tests: a recording store
//! wrapper plus configurable stubs for every external collaborator.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use transfer_core::command::{CommandQueue, CommandRunner};
use transfer_core::dispatch::{
    DispatchError, MessageContext, RemoteMessageDispatcher, RemoteMessageDispatcherRegistry,
};
use transfer_core::flow::{DataFlowController, DataFlowError, DataFlowResponse, DataFlowManager};
use transfer_core::observe::TransferProcessObservable;
use transfer_core::provision::{
    DeprovisionResponse, ProvisionError, ProvisionManager, ProvisionResponse,
    ResourceManifestGenerator,
};
use transfer_core::retry::FixedWaitStrategy;
use transfer_core::state_machine::TransferProcessState;
use transfer_core::status::{StatusChecker, StatusCheckerRegistry};
use transfer_core::store::{InMemoryTransferProcessStore, StoreError, TransferProcessStore};
use transfer_core::types::{
    DataRequest, ProvisionedResource, ProvisionedResourceSet, ResourceDefinition,
    ResourceManifest, TransferProcess, TransferProcessType, TransferType, TypeManager,
};
use transfer_core::TransferProcessManager;

pub const BATCH_SIZE: usize = 10;
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Configured outcome of a stubbed async collaborator call
#[derive(Clone)]
pub enum StubOutcome<T> {
    Ok(T),
    Err(String),
    /// Never resolves; freezes the process in the state under test
    Pending,
}

impl<T: Clone> StubOutcome<T> {
    async fn resolve(&self) -> Result<T, String> {
        match self {
            StubOutcome::Ok(value) => Ok(value.clone()),
            StubOutcome::Err(message) => Err(message.clone()),
            StubOutcome::Pending => futures::future::pending().await,
        }
    }
}

/// Store wrapper recording every scheduler interaction so tests can assert
/// on the exact update sequence, poll counts, and creation counts.
pub struct RecordingStore {
    inner: InMemoryTransferProcessStore,
    updates: Mutex<Vec<(String, TransferProcessState)>>,
    polls: Mutex<Vec<TransferProcessState>>,
    create_calls: AtomicUsize,
    transfer_id_lookups: AtomicUsize,
    fail_reads: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTransferProcessStore::new(),
            updates: Mutex::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            transfer_id_lookups: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub async fn seed(&self, process: TransferProcess) {
        self.inner.create(process).await.expect("seed process");
    }

    pub fn recorded_updates(&self) -> Vec<(String, TransferProcessState)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_states(&self, process_id: &str) -> Vec<TransferProcessState> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == process_id)
            .map(|(_, state)| *state)
            .collect()
    }

    /// Update states with adjacent duplicates collapsed; duplicate writes of
    /// the same target state are legal when a callback races a tick.
    pub fn distinct_update_states(&self, process_id: &str) -> Vec<TransferProcessState> {
        let mut states = Vec::new();
        for state in self.update_states(process_id) {
            if states.last() != Some(&state) {
                states.push(state);
            }
        }
        states
    }

    pub fn polls_for(&self, state: TransferProcessState) -> usize {
        self.polls.lock().unwrap().iter().filter(|s| **s == state).count()
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn transfer_id_lookup_count(&self) -> usize {
        self.transfer_id_lookups.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransferProcessStore for RecordingStore {
    async fn next_for_state(
        &self,
        state: TransferProcessState,
        batch_size: usize,
    ) -> Result<Vec<TransferProcess>, StoreError> {
        self.polls.lock().unwrap().push(state);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".to_string()));
        }
        self.inner.next_for_state(state, batch_size).await
    }

    async fn find(&self, process_id: &str) -> Result<Option<TransferProcess>, StoreError> {
        self.inner.find(process_id).await
    }

    async fn process_id_for_transfer_id(
        &self,
        transfer_id: &str,
    ) -> Result<Option<String>, StoreError> {
        self.transfer_id_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.process_id_for_transfer_id(transfer_id).await
    }

    async fn create(&self, process: TransferProcess) -> Result<(), StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(process).await
    }

    async fn update(&self, process: TransferProcess) -> Result<(), StoreError> {
        self.updates
            .lock()
            .unwrap()
            .push((process.id().to_string(), process.state()));
        self.inner.update(process).await
    }
}

pub struct StubProvisionManager {
    pub provision_outcome: StubOutcome<Vec<ProvisionResponse>>,
    pub deprovision_outcome: StubOutcome<Vec<DeprovisionResponse>>,
    provision_calls: AtomicUsize,
    deprovision_calls: AtomicUsize,
}

impl StubProvisionManager {
    fn new(
        provision_outcome: StubOutcome<Vec<ProvisionResponse>>,
        deprovision_outcome: StubOutcome<Vec<DeprovisionResponse>>,
    ) -> Self {
        Self {
            provision_outcome,
            deprovision_outcome,
            provision_calls: AtomicUsize::new(0),
            deprovision_calls: AtomicUsize::new(0),
        }
    }

    pub fn provision_call_count(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    pub fn deprovision_call_count(&self) -> usize {
        self.deprovision_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisionManager for StubProvisionManager {
    async fn provision(
        &self,
        _process: &TransferProcess,
    ) -> Result<Vec<ProvisionResponse>, ProvisionError> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        self.provision_outcome
            .resolve()
            .await
            .map_err(ProvisionError::Failure)
    }

    async fn deprovision(
        &self,
        _process: &TransferProcess,
    ) -> Result<Vec<DeprovisionResponse>, ProvisionError> {
        self.deprovision_calls.fetch_add(1, Ordering::SeqCst);
        self.deprovision_outcome
            .resolve()
            .await
            .map_err(ProvisionError::Failure)
    }
}

pub struct StubManifestGenerator {
    outcome: Result<Vec<ResourceDefinition>, String>,
}

impl ResourceManifestGenerator for StubManifestGenerator {
    fn generate_resource_manifest(
        &self,
        _process: &TransferProcess,
    ) -> Result<ResourceManifest, ProvisionError> {
        match &self.outcome {
            Ok(definitions) => Ok(ResourceManifest::new(definitions.clone())),
            Err(message) => Err(ProvisionError::ManifestGeneration(message.clone())),
        }
    }
}

pub struct RecordingDispatcher {
    outcome: StubOutcome<serde_json::Value>,
    sends: AtomicUsize,
}

impl RecordingDispatcher {
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteMessageDispatcher for RecordingDispatcher {
    fn protocol(&self) -> &str {
        transfer_core::types::DEFAULT_PROTOCOL
    }

    async fn send(
        &self,
        _message: serde_json::Value,
        _context: &MessageContext,
    ) -> Result<serde_json::Value, DispatchError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.outcome.resolve().await.map_err(DispatchError::SendFailed)
    }
}

struct StubFlowController {
    outcome: Result<String, String>,
}

#[async_trait]
impl DataFlowController for StubFlowController {
    fn can_handle(&self, _request: &DataRequest) -> bool {
        true
    }

    async fn initiate(
        &self,
        _process: &TransferProcess,
    ) -> Result<DataFlowResponse, DataFlowError> {
        match &self.outcome {
            Ok(endpoint_ref) => Ok(DataFlowResponse {
                endpoint_ref: endpoint_ref.clone(),
            }),
            Err(message) => Err(DataFlowError::InitiateFailed(message.clone())),
        }
    }
}

struct FixedStatusChecker {
    complete: bool,
}

impl StatusChecker for FixedStatusChecker {
    fn is_complete(&self, _process: &TransferProcess, _resource: &ProvisionedResource) -> bool {
        self.complete
    }
}

/// Configuration of every stubbed collaborator. Defaults freeze a process
/// wherever external input would be needed: provisioning hangs, dispatch
/// and data flow fail, no status checkers are registered.
pub struct HarnessOptions {
    pub manifest: Result<Vec<ResourceDefinition>, String>,
    pub provision: StubOutcome<Vec<ProvisionResponse>>,
    pub deprovision: StubOutcome<Vec<DeprovisionResponse>>,
    pub dispatch: StubOutcome<serde_json::Value>,
    pub flow: Result<String, String>,
    pub checkers: Vec<(&'static str, bool)>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            manifest: Ok(Vec::new()),
            provision: StubOutcome::Pending,
            deprovision: StubOutcome::Pending,
            dispatch: StubOutcome::Err("dispatcher not configured".to_string()),
            flow: Err("data flow not configured".to_string()),
            checkers: Vec::new(),
        }
    }
}

pub struct TestHarness {
    pub store: Arc<RecordingStore>,
    pub provision_manager: Arc<StubProvisionManager>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub command_queue: Arc<CommandQueue>,
    pub manager: TransferProcessManager,
}

impl TestHarness {
    pub fn new(options: HarnessOptions) -> Self {
        let store = Arc::new(RecordingStore::new());
        let provision_manager = Arc::new(StubProvisionManager::new(
            options.provision,
            options.deprovision,
        ));
        let dispatcher = Arc::new(RecordingDispatcher {
            outcome: options.dispatch,
            sends: AtomicUsize::new(0),
        });

        let mut dispatcher_registry = RemoteMessageDispatcherRegistry::new();
        dispatcher_registry.register(dispatcher.clone());

        let mut data_flow_manager = DataFlowManager::new();
        data_flow_manager.register(Arc::new(StubFlowController {
            outcome: options.flow,
        }));

        let mut status_checker_registry = StatusCheckerRegistry::new();
        for (kind, complete) in options.checkers {
            status_checker_registry.register(kind, Arc::new(FixedStatusChecker { complete }));
        }

        let observable = Arc::new(TransferProcessObservable::new());
        let command_queue = Arc::new(CommandQueue::new(BATCH_SIZE));
        let command_runner = Arc::new(CommandRunner::new(store.clone(), observable.clone()));

        let manager = TransferProcessManager::builder()
            .store(store.clone())
            .provision_manager(provision_manager.clone())
            .data_flow_manager(Arc::new(data_flow_manager))
            .dispatcher_registry(Arc::new(dispatcher_registry))
            .manifest_generator(Arc::new(StubManifestGenerator {
                outcome: options.manifest,
            }))
            .status_checker_registry(Arc::new(status_checker_registry))
            .observable(observable)
            .command_queue(command_queue.clone())
            .command_runner(command_runner)
            .wait_strategy(Box::new(FixedWaitStrategy::new(1)))
            .type_manager(TypeManager::new())
            .batch_size(BATCH_SIZE)
            .build()
            .expect("manager wiring");

        Self {
            store,
            provision_manager,
            dispatcher,
            command_queue,
            manager,
        }
    }
}

pub fn transfer_process(id: &str, state: TransferProcessState) -> TransferProcess {
    transfer_process_with(
        id,
        state,
        TransferProcessType::Consumer,
        TransferType::finite(),
        true,
        Vec::new(),
    )
}

pub fn transfer_process_with(
    id: &str,
    state: TransferProcessState,
    process_type: TransferProcessType,
    transfer_type: TransferType,
    managed_resources: bool,
    resources: Vec<ProvisionedResource>,
) -> TransferProcess {
    let mut resource_set = ProvisionedResourceSet::new();
    for resource in resources {
        resource_set.add_resource(resource);
    }

    TransferProcess::builder()
        .id(id)
        .process_type(process_type)
        .state(state)
        .data_request(
            DataRequest::new(format!("{id}-transfer"), "test-type")
                .with_transfer_type(transfer_type)
                .with_managed_resources(managed_resources),
        )
        .provisioned_resources(resource_set)
        .build()
        .expect("transfer process fixture")
}

pub fn destination_resource(id: &str) -> ProvisionedResource {
    ProvisionedResource::data_destination(id, format!("{id}-definition"), "test-resource", json!({}))
}

pub fn destination_response(id: &str) -> ProvisionResponse {
    ProvisionResponse::new(destination_resource(id))
}

pub fn deprovision_response(id: &str) -> DeprovisionResponse {
    DeprovisionResponse::new(destination_resource(id))
}

/// Poll the store until the process reaches `state` or the timeout expires
pub async fn await_state(store: &RecordingStore, process_id: &str, state: TransferProcessState) {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        if let Ok(Some(process)) = store.find(process_id).await {
            if process.state() == state {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for process {process_id} to reach {state}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Give the scheduler a handful of ticks to (not) act
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
