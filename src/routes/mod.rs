// Route exports
pub mod icp;
pub mod leads;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(leads::configure)
            .configure(icp::configure),
    );
}
