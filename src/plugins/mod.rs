pub mod local_view;
pub mod scene;
pub mod view_stack;
