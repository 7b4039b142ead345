pub(crate) mod declare;
pub(crate) mod listen;
pub(crate) mod publish;
