//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::OpenApi;

use crate::models::{
    // Call models
    CallRequestView,
    ClearedResponse,
    // Print models
    CreatePrintJobRequest,
    EnqueueCallRequest,
    EnqueueCallResponse,
    EnqueueResult,
    PrintJobResponse,
    PrintStatusResponse,
    QueueStatusResponse,
    SequencerStateResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Call endpoints
        super::call::call_ticket,
        super::call::recall_ticket,
        super::call::get_status,
        super::call::start_sequencer,
        super::call::stop_sequencer,
        super::call::clear_history,
        // Print endpoints
        super::print::create_print_job,
        super::print::get_print_status,
        super::print::clear_print_queue,
        // Event stream
        super::events::subscribe_events,
    ),
    info(
        title = "qcall API",
        version = "0.1.0",
        description = "Patient queue calling core: serialized call announcements, spoken clips, and ticket printing.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Call", description = "Call - Call/recall queue and sequencer administration"),
        (name = "Print", description = "Print - Ticket slip printing"),
        (name = "Events", description = "Events - Server-Sent Events for displays and counters"),
    ),
    components(
        schemas(
            // Call
            EnqueueCallRequest,
            EnqueueCallResponse,
            EnqueueResult,
            CallRequestView,
            QueueStatusResponse,
            SequencerStateResponse,
            ClearedResponse,
            // Print
            CreatePrintJobRequest,
            PrintJobResponse,
            PrintStatusResponse,
        )
    ),
)]
pub struct ApiDoc;
