//! OpenAPI Documentation
//!
//! Operator API only; provider webhooks are not part of the public contract.

use utoipa::OpenApi;

use crate::models::{
    // Call models
    CallDetailResponse,
    CallEventResponse,
    CallResponse,
    CollectedInputResponse,
    // Delivery models
    CreateDeliveryRequest,
    // Script models
    CreateScriptRequest,
    DeliveryResponse,
    InitiateCallRequest,
    ScriptResponse,
    StatsResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Script endpoints
        super::scripts::list_scripts,
        super::scripts::create_script,
        super::scripts::get_script,
        super::scripts::delete_script,
        // Call endpoints
        super::calls::list_calls,
        super::calls::initiate_call,
        super::calls::call_stats,
        super::calls::get_call,
        super::calls::escalate_call,
        super::calls::hang_up_call,
        super::calls::record_call,
        // Delivery endpoints
        super::deliveries::list_deliveries,
        super::deliveries::create_delivery,
        super::deliveries::get_delivery,
    ),
    info(
        title = "Callflow API",
        version = "0.1.0",
        description = "Scripted outbound voice calls with DTMF input collection and durable status notifications.",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    tags(
        (name = "Scripts", description = "Saved call flows"),
        (name = "Calls", description = "Call sessions and operator actions"),
        (name = "Deliveries", description = "Outbound notification queue"),
    ),
    components(
        schemas(
            // Script
            CreateScriptRequest,
            ScriptResponse,
            // Call
            InitiateCallRequest,
            CollectedInputResponse,
            CallResponse,
            CallEventResponse,
            CallDetailResponse,
            StatsResponse,
            // Delivery
            CreateDeliveryRequest,
            DeliveryResponse,
        )
    ),
)]
pub struct ApiDoc;
