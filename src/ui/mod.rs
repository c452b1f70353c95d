pub mod terminal_ui;
