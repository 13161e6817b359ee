//! HTTP API server with observability for the factory ledger.
//!
//! Exposes the write path (reconciliation coordinator) and the read path
//! (query facade) as the REST surface the presentation layer consumes,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post, put};
use coordinator::ReconciliationCoordinator;
use domain::{CustomerDirectory, ProductCatalog, WorkerRoster};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{ProjectionProcessor, QueryFacade};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Workers
        .route("/worker/all", get(routes::workers::list::<S>))
        .route("/worker/register", post(routes::workers::register::<S>))
        .route("/worker/{id}/edit", post(routes::workers::edit::<S>))
        .route("/worker/{id}/delete", delete(routes::workers::remove::<S>))
        // Leave
        .route("/leave/{workerId}/worker", get(routes::leave::for_worker::<S>))
        .route("/leave/day", get(routes::leave::day::<S>))
        .route("/leave/add", post(routes::leave::add::<S>))
        .route("/leave/edit", post(routes::leave::edit::<S>))
        .route("/leave/delete", delete(routes::leave::remove::<S>))
        // Products
        .route("/product/getAll", get(routes::products::get_all::<S>))
        .route("/product/add", post(routes::products::add::<S>))
        .route("/product/edit", put(routes::products::edit::<S>))
        .route("/product/{id}/delete", delete(routes::products::remove::<S>))
        .route(
            "/product/{id}/admin/delete",
            delete(routes::products::admin_remove::<S>),
        )
        // Storage
        .route("/storage/getAll", get(routes::storage::get_all::<S>))
        .route("/storage/add", post(routes::storage::add::<S>))
        .route("/storage/{id}/edit", put(routes::storage::edit::<S>))
        .route("/storage/{id}/delete", delete(routes::storage::remove::<S>))
        // Production
        .route("/production/getAll", get(routes::production::get_all::<S>))
        .route("/production/add", post(routes::production::add::<S>))
        .route("/production/edit", put(routes::production::edit::<S>))
        .route(
            "/production/{id}/delete",
            delete(routes::production::remove::<S>),
        )
        // Sales
        .route("/sale/getAll", get(routes::sales::get_all::<S>))
        .route("/sale/add", post(routes::sales::add::<S>))
        .route("/sale/edit", put(routes::sales::edit::<S>))
        .route("/sale/{id}/delete", delete(routes::sales::remove::<S>))
        // Customers
        .route("/customer/all", get(routes::customers::all::<S>))
        .route("/customer/add", post(routes::customers::add::<S>))
        .route("/customer/edit", post(routes::customers::edit::<S>))
        .route("/customer/{id}/delete", delete(routes::customers::remove::<S>))
        // Returned wax
        .route(
            "/returned-wax",
            get(routes::returns::list::<S>).post(routes::returns::create::<S>),
        )
        .route("/returned-wax/{id}", delete(routes::returns::remove::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: fresh registries, a
/// coordinator over the given store, and a projection processor wired
/// to the query facade's views.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    lock_wait: Duration,
) -> (Arc<AppState<S>>, Arc<ProjectionProcessor<S>>) {
    let products = ProductCatalog::new();
    let customers = CustomerDirectory::new();
    let workers = WorkerRoster::new();

    let coordinator = ReconciliationCoordinator::new(
        event_store.clone(),
        products.clone(),
        customers.clone(),
        workers.clone(),
        lock_wait,
    );

    let facade = QueryFacade::new(products, customers, workers);
    let mut processor = ProjectionProcessor::new(event_store);
    facade.register_views(&mut processor);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        coordinator,
        facade,
        projection_processor: processor.clone(),
    });

    (state, processor)
}
