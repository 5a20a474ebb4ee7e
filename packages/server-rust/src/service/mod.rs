//! Operation pipeline around the filter service.
//!
//! 1. **Classification** (`classify`): `RouterEnvelope` -> `Result<Operation, ClassifyError>`
//! 2. **Middleware** (`middleware`): tower layers (load shedding, timeout, metrics)
//! 3. **Routing** (`router`): dispatch to the handling service by `service_name`
//! 4. **Handlers**: `routing` matches and delivers messages, `control`
//!    manages subscriptions
//! 5. **Delivery** (`dispatch`): multicast to recipients through an
//!    `EndpointDispatcher`

pub mod classify;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod middleware;
pub mod operation;
pub mod router;
pub mod routing;

pub use classify::{OperationService, RouterEnvelope};
pub use config::{DispatchOptions, RecipientMode, RouterConfig};
pub use control::{ControlService, PredicateRegistry};
pub use dispatch::{dispatch_all, DeliveryReport, DispatchError, EndpointDispatcher};
pub use operation::{
    service_names, ClassifyError, Operation, OperationContext, OperationError, OperationResponse,
};
pub use router::{build_router, OperationRouter};
pub use routing::RoutingService;
