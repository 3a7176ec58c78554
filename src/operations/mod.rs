pub mod dashboard_op;
pub mod frame_op;
pub mod inventory_op;
pub mod op_helper;
pub mod scan_op;
