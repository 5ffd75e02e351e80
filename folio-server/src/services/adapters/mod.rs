pub mod document_adapter;
