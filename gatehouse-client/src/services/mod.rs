pub mod cancellation;
pub mod collections;
pub mod federation;
pub mod interceptor;
pub mod session;
pub mod switcher;
pub mod transport;

pub use cancellation::AutoCancelRegistry;
pub use collections::{CollectionClient, QueryOptions, RecordService};
pub use federation::{FederationClient, TokenBundle};
pub use interceptor::{AuthHeaderStyle, RequestInterceptor};
pub use session::SessionManager;
pub use switcher::ContextSwitcher;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
