use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open bucket")]
    Bucket,
    #[display("{_0} support is not compiled in")]
    Unsupported(#[error(not(source))] &'static str),
    #[display("harvest failed")]
    Harvest,
    #[display("verification failed")]
    Verify,
    #[display("could not write output")]
    Output,
}
