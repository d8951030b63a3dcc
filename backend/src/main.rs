use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

use backend::{
    document_storage::{DocumentStorage, S3BlobStore},
    jwt::JwtManager,
    server,
    types::Environment,
};
use portal_storage::{Catalog, DynamoDbStore};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON logs are picked up by the Datadog agent in staging/production
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    let aws_config = environment.aws_config().await;
    let dynamodb_client = Arc::new(DynamoDbClient::new(&aws_config));
    let catalog = Arc::new(Catalog::new(
        Arc::new(DynamoDbStore::new(dynamodb_client)),
        environment.catalog_tables(),
    ));

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let documents = Arc::new(DocumentStorage::new(Arc::new(S3BlobStore::new(
        s3_client,
        environment.s3_bucket(),
    ))));

    let jwt_manager = Arc::new(JwtManager::from_environment(&environment)?);

    server::start(environment, catalog, documents, jwt_manager).await
}
