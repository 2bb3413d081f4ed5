//! ABI bindings for the three AgriRisk contracts.

use alloy::sol;

sol! {
    #[sol(rpc)]
    contract MarketFactory {
        struct MarketInfo {
            uint256 id;
            string title;
            string description;
            uint8 marketType;
            string region;
            uint256 endTime;
            uint8 oracleType;
            uint8 status;
            address creator;
            uint256 createdAt;
            bool resolved;
            bool outcome;
        }

        event MarketCreated(
            uint256 indexed marketId,
            address indexed creator,
            string title,
            uint8 marketType,
            string region,
            uint256 endTime
        );

        function createMarket(
            string _title,
            string _description,
            uint8 _marketType,
            string _region,
            uint256 _endTime,
            uint8 _oracleType
        ) external returns (uint256);

        function getMarket(uint256 _marketId) external view returns (MarketInfo memory);
        function getTotalMarkets() external view returns (uint256);
        function isMarketOpen(uint256 _marketId) external view returns (bool);
        function owner() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    contract StakingContract {
        function placeStake(uint256 _marketId, bool _prediction) external payable;

        function getMarketStakes(uint256 _marketId)
            external
            view
            returns (uint256 totalStaked, uint256 yesStake, uint256 noStake, uint256 participantCount);

        function getUserStake(uint256 _marketId, address _user) external view returns (uint256);
        function marketFactory() external view returns (address);
        function resolutionContract() external view returns (address);
        function setMarketFactory(address _marketFactory) external;
        function setResolutionContract(address _resolutionContract) external;
    }
}

sol! {
    #[sol(rpc)]
    contract ResolutionContract {
        function resolveMarket(uint256 _marketId, bool _outcome) external;
        function isMarketResolved(uint256 _marketId) external view returns (bool);
        function getMarketOutcome(uint256 _marketId) external view returns (bool);
    }
}
