//! Scripted in-memory repositories for lifecycle tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use cloudkube::{
    api::{
        Cluster, ClusterCreateRequest, NodePool, NodePoolCreateRequest, NodePoolUpdateRequest,
    },
    repository::{MutableRepository, ResourceRepository, TransportError},
};
use reqwest::{Method, StatusCode};

/// One scripted answer to a `get` call.
#[derive(Debug, Clone, Copy)]
pub enum Fetch {
    Status(&'static str),
    NotFound,
    Unavailable,
}

pub fn unavailable(method: Method) -> TransportError {
    TransportError::Api {
        method,
        endpoint: "/scripted".to_string(),
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "Service temporarily unavailable".to_string(),
    }
}

pub fn not_found() -> TransportError {
    TransportError::NotFound {
        endpoint: "/scripted".to_string(),
    }
}

/// Replays scripted responses and counts every call.
///
/// A `get` beyond the end of the script fails with a transport error so a
/// test that polls more than expected fails instead of hanging.
pub struct Scripted<T> {
    id: String,
    make: fn(&str, &str) -> T,
    create: Mutex<Option<Result<(), TransportError>>>,
    fetches: Mutex<VecDeque<Fetch>>,
    deletes: Mutex<VecDeque<Result<(), TransportError>>>,
    pub create_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl<T> Scripted<T> {
    fn with(id: &str, make: fn(&str, &str) -> T, fetches: &[Fetch]) -> Self {
        Self {
            id: id.to_string(),
            make,
            create: Mutex::new(None),
            fetches: Mutex::new(fetches.iter().copied().collect()),
            deletes: Mutex::new(VecDeque::new()),
            create_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Make the next create call fail.
    pub fn failing_create(self, err: TransportError) -> Self {
        *self.create.lock().unwrap() = Some(Err(err));
        self
    }

    /// Answers to successive delete calls; once exhausted, deletes succeed.
    pub fn deletes(self, results: Vec<Result<(), TransportError>>) -> Self {
        *self.deletes.lock().unwrap() = results.into();
        self
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn deletes_issued(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn do_create(&self) -> Result<T, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        match self.create.lock().unwrap().take() {
            Some(Err(err)) => Err(err),
            _ => Ok((self.make)(&self.id, "INSTALLING")),
        }
    }

    fn do_get(&self, id: &str) -> Result<T, TransportError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(id, self.id, "probed the wrong resource");
        match self.fetches.lock().unwrap().pop_front() {
            Some(Fetch::Status(status)) => Ok((self.make)(&self.id, status)),
            Some(Fetch::NotFound) => Err(not_found()),
            Some(Fetch::Unavailable) | None => Err(unavailable(Method::GET)),
        }
    }

    fn do_delete(&self) -> Result<(), TransportError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

pub fn cluster(id: &str, status: &str) -> Cluster {
    Cluster {
        id: id.to_string(),
        name: "demo".to_string(),
        region: Some("GRA7".to_string()),
        version: "1.29".to_string(),
        status: status.to_string(),
        url: None,
        nodes_url: None,
        is_up_to_date: true,
        control_plane_is_up_to_date: true,
        next_upgrade_versions: Vec::new(),
        update_policy: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn node_pool(id: &str, status: &str) -> NodePool {
    NodePool {
        id: id.to_string(),
        project_id: Some("project".to_string()),
        name: "workers".to_string(),
        flavor: "b2-7".to_string(),
        status: status.to_string(),
        desired_nodes: 1,
        min_nodes: 0,
        max_nodes: 3,
        current_nodes: None,
        monthly_billed: false,
        created_at: None,
        updated_at: None,
    }
}

pub fn clusters(id: &str, fetches: &[Fetch]) -> Scripted<Cluster> {
    Scripted::with(id, cluster, fetches)
}

pub fn node_pools(id: &str, fetches: &[Fetch]) -> Scripted<NodePool> {
    Scripted::with(id, node_pool, fetches)
}

pub fn cluster_request() -> ClusterCreateRequest {
    ClusterCreateRequest {
        name: "demo".to_string(),
        region: Some("GRA7".to_string()),
        version: "1.29".to_string(),
    }
}

pub fn node_pool_request() -> NodePoolCreateRequest {
    NodePoolCreateRequest {
        name: "workers".to_string(),
        flavor_name: "b2-7".to_string(),
        desired_nodes: 1,
        min_nodes: 0,
        max_nodes: 3,
        monthly_billed: false,
    }
}

impl ResourceRepository for Scripted<Cluster> {
    type Resource = Cluster;
    type CreateRequest = ClusterCreateRequest;

    const KIND: &'static str = "cluster";

    async fn create(&self, _request: &ClusterCreateRequest) -> Result<Cluster, TransportError> {
        self.do_create()
    }

    async fn get(&self, id: &str) -> Result<Cluster, TransportError> {
        self.do_get(id)
    }

    async fn delete(&self, _id: &str) -> Result<(), TransportError> {
        self.do_delete()
    }
}

impl ResourceRepository for Scripted<NodePool> {
    type Resource = NodePool;
    type CreateRequest = NodePoolCreateRequest;

    const KIND: &'static str = "node pool";

    async fn create(&self, _request: &NodePoolCreateRequest) -> Result<NodePool, TransportError> {
        self.do_create()
    }

    async fn get(&self, id: &str) -> Result<NodePool, TransportError> {
        self.do_get(id)
    }

    async fn delete(&self, _id: &str) -> Result<(), TransportError> {
        self.do_delete()
    }
}

impl MutableRepository for Scripted<NodePool> {
    type UpdateRequest = NodePoolUpdateRequest;

    async fn update(
        &self,
        _id: &str,
        _request: &NodePoolUpdateRequest,
    ) -> Result<(), TransportError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
