// Include tests
#[cfg(test)]
mod tests {
    use crate::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// Boots a server on an ephemeral port and returns its address.
    async fn spawn_server(config: ServerConfig) -> (SocketAddr, Arc<RpsServer>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(RpsServer::new(config));
        let runner = server.clone();
        tokio::spawn(async move {
            runner.start_with_listener(listener).await.unwrap();
        });
        (addr, server)
    }

    fn fast_config(join_wait_secs: u64, move_wait_secs: u64) -> ServerConfig {
        ServerConfig {
            join_wait_secs,
            move_wait_secs,
            ..ServerConfig::default()
        }
    }

    struct TestClient {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (read_half, writer) = stream.into_split();
            Self {
                lines: BufReader::new(read_half).lines(),
                writer,
            }
        }

        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }

        /// Reads lines until one contains `needle`, skipping everything else.
        async fn expect(&mut self, needle: &str) -> String {
            timeout(WAIT, async {
                loop {
                    let line = self
                        .lines
                        .next_line()
                        .await
                        .unwrap()
                        .unwrap_or_else(|| panic!("connection closed while waiting for {needle:?}"));
                    if line.contains(needle) {
                        return line;
                    }
                }
            })
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
        }

        /// Connects and completes the nickname handshake.
        async fn login(addr: SocketAddr, nickname: &str) -> Self {
            let mut client = Self::connect(addr).await;
            client.expect("What is your nickname?").await;
            client.send(nickname).await;
            client.expect("You are connected with").await;
            client
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_roster_and_chat() {
        let (addr, _server) = spawn_server(ServerConfig::default()).await;

        let mut alice = TestClient::login(addr, "alice").await;

        let mut bob = TestClient::connect(addr).await;
        bob.expect("What is your nickname?").await;
        bob.send("bob").await;
        let roster = bob.expect("You are connected with").await;
        assert!(roster.contains("1 other users"), "{roster}");
        assert!(roster.contains("alice"), "{roster}");
        bob.expect("rps start @user").await;

        alice.expect("*bob has joined*").await;

        bob.send("hello everyone").await;
        let chat = alice.expect("<bob> hello everyone").await;
        assert!(chat.starts_with('['), "chat lines are timestamped: {chat}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_nickname_taken_reprompts() {
        let (addr, _server) = spawn_server(ServerConfig::default()).await;

        let _alice = TestClient::login(addr, "alice").await;

        let mut imposter = TestClient::connect(addr).await;
        imposter.expect("What is your nickname?").await;
        imposter.send("alice").await;
        imposter.expect("'alice' is taken/invalid").await;
        imposter.send("not a name!").await;
        imposter.expect("is taken/invalid").await;
        imposter.send("bob").await;
        imposter.expect("You are connected with").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_match_and_return_to_chat() {
        let (addr, server) = spawn_server(fast_config(5, 5)).await;

        let mut alice = TestClient::login(addr, "alice").await;
        let mut bob = TestClient::login(addr, "bob").await;
        alice.expect("*bob has joined*").await;

        alice.send("rps start @bob").await;
        alice.expect("Waiting for opponent to join").await;
        bob.expect("<alice> has sent you a game request").await;
        bob.send("accept @alice").await;

        alice.expect("Welcome to RPS!").await;
        bob.expect("Welcome to RPS!").await;

        alice.send("ROCK").await;
        bob.send("scissors").await;

        alice.expect("You chose to play ROCK").await;
        alice.expect("<bob> chose to play SCISSORS").await;
        alice.expect("Winner was <alice>!").await;
        bob.expect("<alice> chose to play ROCK").await;
        bob.expect("Winner was <alice>!").await;

        // Both players are back in chat and the match state is gone.
        assert_eq!(server.matches().live_count(), 0);
        alice.send("good game").await;
        bob.expect("<alice> good game").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_challenge_rejections() {
        let (addr, _server) = spawn_server(ServerConfig::default()).await;

        let mut alice = TestClient::login(addr, "alice").await;
        let _bob = TestClient::login(addr, "bob").await;
        alice.expect("*bob has joined*").await;

        alice.send("rps start @ghost").await;
        alice.expect("<ghost> is not online.").await;

        alice.send("rps start @alice").await;
        alice.expect("You can't start a game against yourself.").await;

        alice.send("rps start @bob @carol").await;
        alice.expect("Pick only one opponent.").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_join_timeout_returns_to_chat() {
        let (addr, _server) = spawn_server(fast_config(1, 1)).await;

        let mut alice = TestClient::login(addr, "alice").await;
        let mut bob = TestClient::login(addr, "bob").await;
        alice.expect("*bob has joined*").await;

        alice.send("rps start @bob").await;
        bob.expect("has sent you a game request").await;
        // Bob ignores the request until alice's join wait runs out.
        alice.expect("Opponent hasn't joined.").await;

        // A late accept gets its own join wait, which also runs out.
        bob.send("accept @alice").await;
        bob.expect("Waiting for opponent to join").await;
        bob.expect("Opponent hasn't joined.").await;

        // Both are back in chat.
        alice.send("never mind").await;
        bob.expect("<alice> never mind").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_opponent_disconnect_mid_match() {
        let (addr, _server) = spawn_server(fast_config(5, 1)).await;

        let mut alice = TestClient::login(addr, "alice").await;
        let mut bob = TestClient::login(addr, "bob").await;
        alice.expect("*bob has joined*").await;

        alice.send("rps start @bob").await;
        bob.expect("has sent you a game request").await;
        bob.send("accept @alice").await;
        alice.expect("Welcome to RPS!").await;
        bob.expect("Welcome to RPS!").await;

        drop(bob);
        alice.expect("*bob has left*").await;

        alice.send("ROCK").await;
        alice.expect("Opponent seems to have gone idle/away").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_full_rejection() {
        let config = ServerConfig {
            max_connections: 1,
            ..ServerConfig::default()
        };
        let (addr, _server) = spawn_server(config).await;

        let _alice = TestClient::login(addr, "alice").await;

        let mut rejected = TestClient::connect(addr).await;
        rejected.expect("server is full").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_stops_accept_loop() {
        let (addr, server) = spawn_server(ServerConfig::default()).await;
        let _alice = TestClient::login(addr, "alice").await;

        server.shutdown();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(TcpStream::connect(addr).await.is_err() || {
            // The OS may still complete the handshake on a closed listener;
            // either way no session is created for it.
            server.sessions().connection_count().await == 1
        });
    }
}
