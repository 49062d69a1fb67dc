mod article;

pub use article::{Article, NewArticle};
