pub mod card;
pub mod issue;
pub mod objective;
pub mod record;
