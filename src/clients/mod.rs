/// Broker clients consumed by the message buses.
///
/// Each backend is reached through a small trait so the buses can be
/// exercised without a live broker:
/// - SNS via `aws-sdk-sns`
/// - AMQP via `lapin`
pub mod amqp_client;
pub mod sns_client;

pub use amqp_client::{AmqpClient, AmqpClientFactory, AmqpPublishParams, LapinClientFactory};
pub use sns_client::{
    AwsCredentials, AwsSnsClientFactory, SnsClient, SnsClientFactory, SnsPublishOutput,
    SnsPublishParams,
};
